use crate::db::schema::library_entries;
use diesel::prelude::*;

/// Cached entry. List-valued fields are stored as JSON text.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = library_entries)]
pub struct LibraryEntryRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub sref: String,
    pub prompt: String,
    pub images_json: String,
    pub parameters_json: String,
    pub ai_analysis_json: String,
    pub featured: bool,
    pub curator_notes: String,
    pub created_at_ms: i64,
    pub last_modified_ms: i64,
    pub search_text: String,
}

/// Row without a key; the database assigns the next one.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = library_entries)]
pub struct NewLibraryEntryRow {
    pub title: String,
    pub description: String,
    pub sref: String,
    pub prompt: String,
    pub images_json: String,
    pub parameters_json: String,
    pub ai_analysis_json: String,
    pub featured: bool,
    pub curator_notes: String,
    pub created_at_ms: i64,
    pub last_modified_ms: i64,
    pub search_text: String,
}

impl NewLibraryEntryRow {
    pub fn with_id(self, id: i64) -> LibraryEntryRow {
        LibraryEntryRow {
            id,
            title: self.title,
            description: self.description,
            sref: self.sref,
            prompt: self.prompt,
            images_json: self.images_json,
            parameters_json: self.parameters_json,
            ai_analysis_json: self.ai_analysis_json,
            featured: self.featured,
            curator_notes: self.curator_notes,
            created_at_ms: self.created_at_ms,
            last_modified_ms: self.last_modified_ms,
            search_text: self.search_text,
        }
    }
}
