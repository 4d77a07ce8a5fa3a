//! Content-integrity gate for entries.
//!
//! Every entry that reaches the local cache or the remote store passes
//! through here. Raw remote documents are parsed leniently into an
//! [`Entry`] (missing optional fields take their documented defaults) and
//! then checked; the outcome is a [`ParsedEntry`] that is either a valid
//! entry or a rejection reason. Rejected documents are never repaired.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{AdminMetadata, AiAnalysis, Entry, EntryImage, Parameters};
use super::parameters::{self, limits};
use crate::ids::EntryId;
use crate::remote::layout::DELETION_MARKER_PREFIX;
use crate::time::parse_iso;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryRejection {
    #[error("document is not a JSON object: {0}")]
    Malformed(String),

    #[error("document is a deletion marker")]
    DeletionMarker,

    #[error("missing id")]
    MissingId,

    #[error("missing title")]
    MissingTitle,

    #[error("missing parameters")]
    MissingParameters,

    #[error("missing style reference")]
    MissingSref,

    #[error("missing prompt")]
    MissingPrompt,

    #[error("entry has no images")]
    NoImages,

    #[error("image #{index} has no url")]
    ImageWithoutUrl { index: usize },

    #[error("image {url} does not resolve to a stored file")]
    UnresolvedImage { url: String },
}

/// Outcome of the validation step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEntry {
    Valid(Entry),
    Rejected {
        id: Option<String>,
        reason: EntryRejection,
    },
}

impl ParsedEntry {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedEntry::Valid(_))
    }

    pub fn into_result(self) -> Result<Entry, EntryRejection> {
        match self {
            ParsedEntry::Valid(entry) => Ok(entry),
            ParsedEntry::Rejected { reason, .. } => Err(reason),
        }
    }
}

/// Parse a raw `data/entries/<stem>.json` document.
///
/// `stem` is the canonical id; the document's own `id` field must be present
/// but the stem wins when they differ. `image_exists` decides whether an
/// image URL resolves to a stored file.
pub fn parse_remote_document(
    stem: &str,
    raw: &[u8],
    now: DateTime<Utc>,
    image_exists: impl Fn(&str) -> bool,
) -> ParsedEntry {
    if stem.starts_with(DELETION_MARKER_PREFIX) {
        return ParsedEntry::Rejected {
            id: Some(stem.to_string()),
            reason: EntryRejection::DeletionMarker,
        };
    }

    let value: Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(err) => {
            return ParsedEntry::Rejected {
                id: Some(stem.to_string()),
                reason: EntryRejection::Malformed(err.to_string()),
            }
        }
    };

    match entry_from_value(stem, &value, now).and_then(|entry| validate_entry(entry, &image_exists))
    {
        Ok(entry) => ParsedEntry::Valid(entry),
        Err(reason) => ParsedEntry::Rejected {
            id: Some(stem.to_string()),
            reason,
        },
    }
}

/// Structural checks shared by resync, save and update.
///
/// Clamps numeric parameters on success.
pub fn validate_entry(
    mut entry: Entry,
    image_exists: impl Fn(&str) -> bool,
) -> Result<Entry, EntryRejection> {
    if entry.id.as_str().is_empty() {
        return Err(EntryRejection::MissingId);
    }
    if entry.id.as_str().starts_with(DELETION_MARKER_PREFIX) {
        return Err(EntryRejection::DeletionMarker);
    }
    if entry.images.is_empty() {
        return Err(EntryRejection::NoImages);
    }
    for (index, image) in entry.images.iter().enumerate() {
        if image.url.trim().is_empty() {
            return Err(EntryRejection::ImageWithoutUrl { index });
        }
        if !image_exists(&image.url) {
            return Err(EntryRejection::UnresolvedImage {
                url: image.url.clone(),
            });
        }
    }

    entry.parameters = parameters::clamp(entry.parameters);
    Ok(entry)
}

/// Checks for entries authored locally: a style reference must be filled in.
pub fn validate_draft(
    entry: Entry,
    image_exists: impl Fn(&str) -> bool,
) -> Result<Entry, EntryRejection> {
    if entry.parameters.sref.trim().is_empty() {
        return Err(EntryRejection::MissingSref);
    }
    validate_entry(entry, image_exists)
}

fn entry_from_value(stem: &str, value: &Value, now: DateTime<Utc>) -> Result<Entry, EntryRejection> {
    let obj = value
        .as_object()
        .ok_or_else(|| EntryRejection::Malformed(format!("expected object, found {}", kind(value))))?;

    let declared_id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(EntryRejection::MissingId)?;
    if declared_id.starts_with(DELETION_MARKER_PREFIX) {
        return Err(EntryRejection::DeletionMarker);
    }

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .ok_or(EntryRejection::MissingTitle)?
        .to_string();
    let description = string_or_default(obj, "description");

    let images = images_from_value(obj.get("images"))?;
    let parameters = parameters_from_value(obj.get("parameters"))?;
    let admin_metadata = admin_metadata_from_value(obj.get("adminMetadata"), now);
    let ai_analysis = obj
        .get("aiAnalysis")
        .and_then(|raw| serde_json::from_value::<AiAnalysis>(raw.clone()).ok())
        .unwrap_or_else(|| AiAnalysis::placeholder(&description));

    Ok(Entry {
        id: EntryId::from(stem),
        title,
        description,
        images,
        parameters,
        admin_metadata,
        ai_analysis,
    })
}

fn images_from_value(raw: Option<&Value>) -> Result<Vec<EntryImage>, EntryRejection> {
    let items = raw.and_then(Value::as_array).ok_or(EntryRejection::NoImages)?;
    if items.is_empty() {
        return Err(EntryRejection::NoImages);
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let url = item
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| !url.trim().is_empty())
                .ok_or(EntryRejection::ImageWithoutUrl { index })?;
            let thumbnail = item
                .get("thumbnail")
                .and_then(Value::as_str)
                .filter(|thumb| !thumb.is_empty())
                .unwrap_or(url);
            let size = item
                .get("size")
                .and_then(|size| size.as_u64().or_else(|| size.as_f64().map(|f| f.max(0.0) as u64)))
                .unwrap_or(0);
            Ok(EntryImage {
                url: url.to_string(),
                thumbnail: thumbnail.to_string(),
                size,
            })
        })
        .collect()
}

fn parameters_from_value(raw: Option<&Value>) -> Result<Parameters, EntryRejection> {
    let obj = raw
        .and_then(Value::as_object)
        .ok_or(EntryRejection::MissingParameters)?;

    let sref = obj
        .get("sref")
        .and_then(Value::as_str)
        .ok_or(EntryRejection::MissingSref)?
        .to_string();
    let prompt = obj
        .get("prompt")
        .and_then(Value::as_str)
        .ok_or(EntryRejection::MissingPrompt)?
        .to_string();

    let whole = |key: &str, limit| {
        obj.get(key)
            .and_then(Value::as_f64)
            .and_then(|v| parameters::whole_from_f64(v, limit))
    };

    Ok(Parameters {
        sref,
        prompt,
        style: optional_string(obj, "style"),
        ar: optional_string(obj, "ar"),
        chaos: whole("chaos", limits::CHAOS),
        no: obj
            .get("no")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        niji: obj.get("niji").and_then(Value::as_bool),
        version: optional_string(obj, "version"),
        tile: obj.get("tile").and_then(Value::as_bool),
        weird: whole("weird", limits::WEIRD),
        stop: whole("stop", limits::STOP),
        quality: obj
            .get("quality")
            .and_then(Value::as_f64)
            .filter(|q| q.is_finite())
            .map(|q| limits::QUALITY.clamp(q)),
        stylize: whole("stylize", limits::STYLIZE),
        seed: obj
            .get("seed")
            .and_then(|seed| seed.as_u64().or_else(|| seed.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))),
    })
}

fn admin_metadata_from_value(raw: Option<&Value>, now: DateTime<Utc>) -> AdminMetadata {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return AdminMetadata::created(now);
    };

    let timestamp = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .and_then(parse_iso)
            .unwrap_or(now)
    };

    AdminMetadata {
        created_at: timestamp("createdAt"),
        last_modified: timestamp("lastModified"),
        featured: obj.get("featured").and_then(Value::as_bool).unwrap_or(false),
        curator_notes: string_or_default(obj, "curatorNotes"),
    }
}

fn string_or_default(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
