//! Image uploads: acceptance rules and collision-free naming.

use chrono::{DateTime, Utc};
use image::ImageFormat;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Length of the content-hash prefix used by the last naming candidate.
const HASH_PREFIX_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("upload is empty")]
    Empty,

    #[error("upload is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// An image file supplied by an administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Accept JPEG, PNG and WebP up to [`MAX_UPLOAD_BYTES`], sniffed from content.
    pub fn validate(&self) -> Result<ImageFormat, UploadRejection> {
        if self.bytes.is_empty() {
            return Err(UploadRejection::Empty);
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadRejection::TooLarge {
                size: self.bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }

        match image::guess_format(&self.bytes) {
            Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) => Ok(format),
            Ok(other) => Err(UploadRejection::UnsupportedFormat(format!("{other:?}"))),
            Err(_) => Err(UploadRejection::UnsupportedFormat("unknown".to_string())),
        }
    }

    /// Upload names to try, in order, under `images/originals/`.
    pub fn candidate_names(&self, now: DateTime<Utc>) -> Vec<String> {
        candidate_names(&self.file_name, &self.bytes, now)
    }
}

/// Normalise a caller-supplied file name.
///
/// Directory components are discarded, characters outside `[A-Za-z0-9._-]`
/// become `_`, and the result is upper-cased.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "IMAGE".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Bounded sequence of collision-avoiding names: plain, timestamped, then
/// timestamped with a content-hash prefix.
pub fn candidate_names(file_name: &str, bytes: &[u8], now: DateTime<Utc>) -> Vec<String> {
    let name = sanitize_file_name(file_name);
    let ts = now.timestamp_millis();
    let digest = hex::encode(Sha256::digest(bytes));
    let hash = digest[..HASH_PREFIX_LEN].to_ascii_uppercase();

    vec![
        name.clone(),
        format!("{ts}_{name}"),
        format!("{ts}_{hash}_{name}"),
    ]
}
