pub mod layout;

pub use layout::{
    deletion_marker_path, deployment_marker_path, entry_path, entry_stem, image_path,
    image_path_from_url, raw_url, DELETION_MARKER_PREFIX, DEPLOYMENT_MARKER_FILE, ENTRIES_DIR,
    IMAGES_DIR,
};
