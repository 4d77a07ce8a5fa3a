use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use midweave::bootstrap::{
    app_data_dir, default_config_path, init_tracing_subscriber, load_config, resolve_config,
    wire_dependencies,
};
use midweave::cli::{run, Cli};
use mw_core::config::AppConfig;

/// An explicit `--config` must exist; the default location is optional.
fn load_file_config(explicit: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => match default_config_path() {
            Some(path) if path.exists() => load_config(&path),
            _ => Ok(AppConfig::empty()),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may come from a local .env during development.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let loaded = load_file_config(cli.config.as_ref())?;
    let defaults = AppConfig::with_system_defaults(app_data_dir()?);
    let config = resolve_config(loaded, defaults, |key| std::env::var(key).ok());

    init_tracing_subscriber(&config.storage.log_dir)?;
    tracing::debug!(
        database = %config.storage.database_path.display(),
        "Configuration resolved"
    );

    let runtime = wire_dependencies(&config).context("Failed to wire dependencies")?;
    run(cli, runtime).await
}
