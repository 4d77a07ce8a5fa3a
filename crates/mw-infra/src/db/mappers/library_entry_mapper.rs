use crate::db::models::{LibraryEntryRow, NewLibraryEntryRow};
use crate::db::ports::{InsertMapper, RowMapper};
use anyhow::{Context, Result};
use mw_core::entry::search::search_text;
use mw_core::entry::{AdminMetadata, Entry};
use mw_core::time::from_epoch_millis;
use mw_core::EntryId;

pub struct LibraryEntryRowMapper;

impl InsertMapper<Entry, NewLibraryEntryRow> for LibraryEntryRowMapper {
    fn to_row(&self, domain: &Entry) -> Result<NewLibraryEntryRow> {
        Ok(NewLibraryEntryRow {
            title: domain.title.clone(),
            description: domain.description.clone(),
            sref: domain.parameters.sref.clone(),
            prompt: domain.parameters.prompt.clone(),
            images_json: serde_json::to_string(&domain.images)?,
            parameters_json: serde_json::to_string(&domain.parameters)?,
            ai_analysis_json: serde_json::to_string(&domain.ai_analysis)?,
            featured: domain.admin_metadata.featured,
            curator_notes: domain.admin_metadata.curator_notes.clone(),
            created_at_ms: domain.admin_metadata.created_at.timestamp_millis(),
            last_modified_ms: domain.admin_metadata.last_modified.timestamp_millis(),
            search_text: search_text(domain),
        })
    }
}

impl RowMapper<LibraryEntryRow, Entry> for LibraryEntryRowMapper {
    fn to_domain(&self, row: &LibraryEntryRow) -> Result<Entry> {
        Ok(Entry {
            id: EntryId::from_cache_key(row.id),
            title: row.title.clone(),
            description: row.description.clone(),
            images: serde_json::from_str(&row.images_json)
                .with_context(|| format!("corrupt images of cached entry {}", row.id))?,
            parameters: serde_json::from_str(&row.parameters_json)
                .with_context(|| format!("corrupt parameters of cached entry {}", row.id))?,
            admin_metadata: AdminMetadata {
                created_at: from_epoch_millis(row.created_at_ms),
                last_modified: from_epoch_millis(row.last_modified_ms),
                featured: row.featured,
                curator_notes: row.curator_notes.clone(),
            },
            ai_analysis: serde_json::from_str(&row.ai_analysis_json)
                .with_context(|| format!("corrupt analysis of cached entry {}", row.id))?,
        })
    }
}
