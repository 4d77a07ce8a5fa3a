pub mod deployment_signal;
pub mod image_resolution;

pub use deployment_signal::DeploymentSignal;
pub use image_resolution::{
    validate_uploads, ImageIndex, StagedImages, UploadBatchError, UploadFailure,
};
