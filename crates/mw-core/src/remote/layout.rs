//! File layout of the remote store.
//!
//! ```text
//! data/entries/<id>.json          entry document
//! data/entries/.deleted-<id>      deletion marker
//! images/originals/<name>         uploaded image blobs
//! <marker_dir>/last-update.json   deployment marker
//! ```

use crate::ids::EntryId;

pub const ENTRIES_DIR: &str = "data/entries";
pub const IMAGES_DIR: &str = "images/originals";
pub const DELETION_MARKER_PREFIX: &str = ".deleted-";
pub const DEPLOYMENT_MARKER_FILE: &str = "last-update.json";

const ENTRY_EXTENSION: &str = ".json";

pub fn entry_path(id: &EntryId) -> String {
    format!("{ENTRIES_DIR}/{id}{ENTRY_EXTENSION}")
}

pub fn deletion_marker_path(id: &EntryId) -> String {
    format!("{ENTRIES_DIR}/{DELETION_MARKER_PREFIX}{id}")
}

pub fn image_path(file_name: &str) -> String {
    format!("{IMAGES_DIR}/{file_name}")
}

pub fn deployment_marker_path(marker_dir: &str) -> String {
    let dir = marker_dir.trim_matches('/');
    if dir.is_empty() {
        DEPLOYMENT_MARKER_FILE.to_string()
    } else {
        format!("{dir}/{DEPLOYMENT_MARKER_FILE}")
    }
}

/// Id encoded by a file name in the entries directory, `None` for anything
/// that is not an entry document.
pub fn entry_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(ENTRY_EXTENSION)
        .filter(|stem| !stem.is_empty())
}

/// Canonical raw URL of a stored file.
pub fn raw_url(raw_host: &str, owner: &str, repo: &str, branch: &str, path: &str) -> String {
    format!(
        "https://{}/{owner}/{repo}/{branch}/{}",
        raw_host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Remote path an image URL points at.
///
/// The path starts at the `images/originals/` segment; query strings and
/// fragments are ignored. Relative `images/originals/...` paths resolve to
/// themselves.
pub fn image_path_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let marker = format!("{IMAGES_DIR}/");
    let start = without_query.find(&marker)?;
    let path = &without_query[start..];
    (path.len() > marker.len()).then(|| path.to_string())
}
