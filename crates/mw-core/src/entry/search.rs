use super::model::Entry;

/// Case-insensitive substring match across the searchable fields of an entry.
///
/// Fields are OR-combined: title, description, prompt and every text or
/// array value of the AI analysis. A blank query matches everything.
pub fn matches_query(entry: &Entry, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    searchable_fields(entry).any(|field| field.to_lowercase().contains(&needle))
}

/// Lower-cased haystack stored alongside cached rows for prefiltering.
pub fn search_text(entry: &Entry) -> String {
    searchable_fields(entry)
        .filter(|field| !field.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n")
}

fn searchable_fields(entry: &Entry) -> impl Iterator<Item = &str> {
    [
        entry.title.as_str(),
        entry.description.as_str(),
        entry.parameters.prompt.as_str(),
    ]
    .into_iter()
    .chain(entry.ai_analysis.text_fields())
}
