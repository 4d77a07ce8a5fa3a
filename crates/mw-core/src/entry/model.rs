use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntryId;

/// A library record pairing one or more images with Midjourney parameters
/// and the captioning service's analysis.
///
/// This is the document stored at `data/entries/<id>.json` and the payload
/// mirrored into the local cache. Instances are produced by the validation
/// step in [`crate::entry::validation`], so `images` is never empty and
/// numeric parameters are inside their documented ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub images: Vec<EntryImage>,
    pub parameters: Parameters,
    pub admin_metadata: AdminMetadata,
    pub ai_analysis: AiAnalysis,
}

impl Entry {
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(|image| image.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryImage {
    pub url: String,
    pub thumbnail: String,
    pub size: u64,
}

impl EntryImage {
    /// Image whose thumbnail is the full-size URL, as produced by uploads.
    pub fn from_url(url: impl Into<String>, size: u64) -> Self {
        let url = url.into();
        Self {
            thumbnail: url.clone(),
            url,
            size,
        }
    }
}

/// Midjourney generation parameters.
///
/// `sref` is the primary lookup key. Optional numeric fields are clamped to
/// [`crate::entry::parameters::limits`] during validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub sref: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos: Option<u32>,
    #[serde(default)]
    pub no: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niji: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weird: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylize: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetadata {
    #[serde(with = "crate::time::iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time::iso_millis")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub curator_notes: String,
}

impl AdminMetadata {
    pub fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_modified: now,
            featured: false,
            curator_notes: String::new(),
        }
    }
}

/// Result of the external captioning service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub description: String,
    pub image_type: String,
    #[serde(default)]
    pub style: StyleAnalysis,
    #[serde(default)]
    pub technical: TechnicalAnalysis,
    #[serde(default)]
    pub colors: ColorAnalysis,
    #[serde(default)]
    pub tags: AnalysisTags,
}

impl AiAnalysis {
    /// Placeholder analysis for entries that were never captioned.
    pub fn placeholder(description: &str) -> Self {
        Self {
            description: description.to_string(),
            image_type: "generated".to_string(),
            ..Default::default()
        }
    }

    /// Every free-text value of the analysis, flattened.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        [
            self.description.as_str(),
            self.image_type.as_str(),
            self.style.primary.as_str(),
            self.technical.quality.as_str(),
            self.technical.render_style.as_str(),
            self.technical.detail_level.as_str(),
            self.technical.lighting.as_str(),
            self.colors.mood.as_str(),
            self.colors.contrast.as_str(),
        ]
        .into_iter()
        .chain(self.style.secondary.iter().map(String::as_str))
        .chain(self.style.influences.iter().map(String::as_str))
        .chain(self.colors.palette.iter().map(String::as_str))
        .chain(self.tags.style.iter().map(String::as_str))
        .chain(self.tags.technical.iter().map(String::as_str))
        .chain(self.tags.mood.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleAnalysis {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub influences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAnalysis {
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub render_style: String,
    #[serde(default)]
    pub detail_level: String,
    #[serde(default)]
    pub lighting: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorAnalysis {
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub contrast: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTags {
    #[serde(default)]
    pub style: Vec<String>,
    #[serde(default)]
    pub technical: Vec<String>,
    #[serde(default)]
    pub mood: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_epoch_millis;

    fn sample() -> Entry {
        let now = from_epoch_millis(1_714_566_600_000);
        Entry {
            id: EntryId::from("7"),
            title: "Neon alley".to_string(),
            description: String::new(),
            images: vec![EntryImage::from_url("https://example.test/a.png", 10)],
            parameters: Parameters {
                sref: "12345".to_string(),
                prompt: "rainy alley".to_string(),
                chaos: Some(20),
                ..Default::default()
            },
            admin_metadata: AdminMetadata::created(now),
            ai_analysis: AiAnalysis::placeholder(""),
        }
    }

    #[test]
    fn serializes_with_camel_case_document_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["adminMetadata"]["createdAt"], "2024-05-01T12:30:00.000Z");
        assert_eq!(json["adminMetadata"]["curatorNotes"], "");
        assert_eq!(json["aiAnalysis"]["imageType"], "generated");
        assert_eq!(json["aiAnalysis"]["technical"]["renderStyle"], "");
        assert_eq!(json["parameters"]["chaos"], 20);
        assert!(json["parameters"].get("weird").is_none());
        assert_eq!(json["parameters"]["no"], serde_json::json!([]));
    }

    #[test]
    fn analysis_text_fields_cover_arrays() {
        let mut analysis = AiAnalysis::placeholder("desc");
        analysis.tags.mood.push("moody".to_string());
        analysis.colors.palette.push("#FF00FF".to_string());
        let fields: Vec<&str> = analysis.text_fields().collect();
        assert!(fields.contains(&"desc"));
        assert!(fields.contains(&"moody"));
        assert!(fields.contains(&"#FF00FF"));
    }
}
