//! # Dependency Injection
//!
//! The only place that depends on `mw-infra` and `mw-app` together. It
//! assembles adapters into [`LibraryStorage`]; it makes no decisions about
//! what the library does with them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mw_app::usecases::AdminSession;
use mw_app::{AppDeps, LibraryStorage, StorageOptions};
use mw_core::config::AppConfig;
use mw_infra::db::executor::DieselSqliteExecutor;
use mw_infra::db::mappers::LibraryEntryRowMapper;
use mw_infra::db::pool::{init_db_pool, DbPool};
use mw_infra::db::repositories::DieselEntryCacheRepository;
use mw_infra::{
    GithubContentStore, GithubStoreConfig, OpenAiAnalyzerConfig, OpenAiImageAnalyzer, SystemClock,
};
use tracing::info;

pub type WiringResult<T> = Result<T, WiringError>;

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),

    #[error("Remote store initialization failed: {0}")]
    RemoteStoreInit(String),

    #[error("Image analyzer initialization failed: {0}")]
    AnalyzerInit(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
}

/// Everything the command layer needs.
pub struct AppRuntime {
    pub storage: LibraryStorage,
    pub admin: AdminSession,
}

fn create_db_pool(db_path: &Path) -> WiringResult<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            WiringError::DatabaseInit(format!("Failed to create DB directory: {}", e))
        })?;
    }

    let db_url = db_path
        .to_str()
        .ok_or_else(|| WiringError::DatabaseInit("Invalid database path".to_string()))?;

    init_db_pool(db_url)
        .map_err(|e| WiringError::DatabaseInit(format!("Failed to initialize DB: {:#}", e)))
}

fn require(value: &str, name: &'static str) -> WiringResult<()> {
    if value.trim().is_empty() {
        Err(WiringError::MissingSetting(name))
    } else {
        Ok(())
    }
}

fn storage_options(config: &AppConfig) -> StorageOptions {
    StorageOptions {
        stale_after: Duration::from_secs(config.sync.stale_after_secs),
        deployment_marker_dir: config
            .deployment
            .enabled
            .then(|| config.deployment.marker_dir.clone()),
    }
}

/// Build the runtime from a fully resolved configuration.
pub fn wire_dependencies(config: &AppConfig) -> WiringResult<AppRuntime> {
    require(&config.github.owner, "github.owner")?;
    require(&config.github.repo, "github.repo")?;

    let pool = create_db_pool(&config.storage.database_path)?;
    let cache = Arc::new(DieselEntryCacheRepository::new(
        DieselSqliteExecutor::new(pool),
        LibraryEntryRowMapper,
    ));

    let remote = GithubContentStore::new(GithubStoreConfig::from_app_config(config))
        .map_err(|e| WiringError::RemoteStoreInit(e.to_string()))?;

    let analyzer = OpenAiImageAnalyzer::new(OpenAiAnalyzerConfig::from_app_config(config))
        .map_err(|e| WiringError::AnalyzerInit(format!("{:#}", e)))?;

    let deps = AppDeps {
        remote: Arc::new(remote),
        cache,
        analyzer: Arc::new(analyzer),
        clock: Arc::new(SystemClock),
    };

    info!(
        owner = %config.github.owner,
        repo = %config.github.repo,
        branch = %config.github.branch,
        database = %config.storage.database_path.display(),
        "Dependencies wired"
    );

    Ok(AppRuntime {
        storage: LibraryStorage::new(deps, storage_options(config)),
        admin: AdminSession::new(config.admin.password.clone()),
    })
}
