use chrono::{DateTime, Utc};

use super::model::{AdminMetadata, AiAnalysis, Entry, EntryImage, Parameters};
use crate::ids::EntryId;
use crate::upload::ImageUpload;

/// An image slot of a draft: either already stored remotely or to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftImage {
    Existing(EntryImage),
    Upload(ImageUpload),
}

/// A new entry as authored by an administrator, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryDraft {
    pub title: String,
    pub description: String,
    pub images: Vec<DraftImage>,
    pub parameters: Parameters,
    pub featured: bool,
    pub curator_notes: String,
    pub ai_analysis: Option<AiAnalysis>,
}

impl EntryDraft {
    pub fn uploads(&self) -> impl Iterator<Item = &ImageUpload> {
        self.images.iter().filter_map(|image| match image {
            DraftImage::Upload(upload) => Some(upload),
            DraftImage::Existing(_) => None,
        })
    }

    /// Build the entry once an id and the final image list are known.
    pub fn into_entry(self, id: EntryId, images: Vec<EntryImage>, now: DateTime<Utc>) -> Entry {
        let ai_analysis = self
            .ai_analysis
            .unwrap_or_else(|| AiAnalysis::placeholder(&self.description));

        Entry {
            id,
            title: self.title,
            description: self.description,
            images,
            parameters: self.parameters,
            admin_metadata: AdminMetadata {
                featured: self.featured,
                curator_notes: self.curator_notes,
                ..AdminMetadata::created(now)
            },
            ai_analysis,
        }
    }
}

/// Partial update of an existing entry. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<DraftImage>>,
    pub parameters: Option<Parameters>,
    pub ai_analysis: Option<AiAnalysis>,
    pub featured: Option<bool>,
    pub curator_notes: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Merge the patch over `entry` and bump `lastModified`.
    ///
    /// `images` is the resolved form of `self.images` (uploads already
    /// stored); it replaces the image list when present.
    pub fn apply(
        self,
        mut entry: Entry,
        images: Option<Vec<EntryImage>>,
        now: DateTime<Utc>,
    ) -> Entry {
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(description) = self.description {
            entry.description = description;
        }
        if let Some(images) = images {
            entry.images = images;
        }
        if let Some(parameters) = self.parameters {
            entry.parameters = parameters;
        }
        if let Some(ai_analysis) = self.ai_analysis {
            entry.ai_analysis = ai_analysis;
        }
        if let Some(featured) = self.featured {
            entry.admin_metadata.featured = featured;
        }
        if let Some(notes) = self.curator_notes {
            entry.admin_metadata.curator_notes = notes;
        }
        entry.admin_metadata.last_modified = now;
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_epoch_millis;

    fn draft() -> EntryDraft {
        EntryDraft {
            title: "Glass orchard".to_string(),
            description: "Fruit trees made of glass".to_string(),
            images: vec![DraftImage::Existing(EntryImage::from_url(
                "https://x.test/images/originals/A.PNG",
                3,
            ))],
            parameters: Parameters {
                sref: "31337".to_string(),
                ..Default::default()
            },
            featured: true,
            ..Default::default()
        }
    }

    #[test]
    fn draft_builds_entry_with_placeholder_analysis() {
        let now = from_epoch_millis(1_000);
        let entry = draft().into_entry(EntryId::from("5"), vec![], now);

        assert_eq!(entry.id.as_str(), "5");
        assert!(entry.admin_metadata.featured);
        assert_eq!(entry.admin_metadata.created_at, now);
        assert_eq!(entry.ai_analysis.description, "Fruit trees made of glass");
    }

    #[test]
    fn patch_merges_only_present_fields_and_bumps_last_modified() {
        let created = from_epoch_millis(1_000);
        let later = from_epoch_millis(9_000);
        let entry = draft().into_entry(EntryId::from("5"), vec![], created);

        let patch = EntryPatch {
            title: Some("Glass orchard at dusk".to_string()),
            featured: Some(false),
            ..Default::default()
        };
        let merged = patch.apply(entry.clone(), None, later);

        assert_eq!(merged.title, "Glass orchard at dusk");
        assert_eq!(merged.description, entry.description);
        assert!(!merged.admin_metadata.featured);
        assert_eq!(merged.admin_metadata.created_at, created);
        assert_eq!(merged.admin_metadata.last_modified, later);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(EntryPatch::default().is_empty());
        assert!(!EntryPatch {
            featured: Some(true),
            ..Default::default()
        }
        .is_empty());
    }
}
