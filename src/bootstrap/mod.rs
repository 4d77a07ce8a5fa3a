//! Start-up: configuration, tracing and dependency wiring.

pub mod config;
pub mod tracing;
pub mod wiring;

pub use config::{app_data_dir, default_config_path, load_config, resolve_config};
pub use tracing::init_tracing_subscriber;
pub use wiring::{wire_dependencies, AppRuntime, WiringError};
