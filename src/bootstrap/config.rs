//! # Configuration Loader
//!
//! `load_config` reads and maps the TOML file and nothing else. Defaults and
//! environment secrets are layered on afterwards by [`resolve_config`], so
//! the DTO stays a faithful picture of the file.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use mw_core::config::AppConfig;

pub const ENV_GITHUB_TOKEN: &str = "MIDWEAVE_GITHUB_TOKEN";
pub const ENV_OPENAI_API_KEY: &str = "MIDWEAVE_OPENAI_API_KEY";
pub const ENV_ADMIN_PASSWORD: &str = "MIDWEAVE_ADMIN_PASSWORD";

const APP_DIR: &str = "midweave";
const CONFIG_FILE: &str = "config.toml";

/// Load configuration from a TOML file.
///
/// Empty strings and missing sections are accepted as they are.
pub fn load_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}

/// `<data_dir>/midweave`, e.g. `~/.local/share/midweave` on Linux.
pub fn app_data_dir() -> anyhow::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| anyhow!("Could not determine the user data directory"))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Fill every empty value of `loaded` from `defaults`, then apply secrets
/// from the environment. Environment values win over the file.
pub fn resolve_config(
    loaded: AppConfig,
    defaults: AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> AppConfig {
    let mut config = merge_defaults(loaded, defaults);

    let secret = |key: &str| env(key).filter(|value| !value.trim().is_empty());
    if let Some(token) = secret(ENV_GITHUB_TOKEN) {
        config.github.token = token;
    }
    if let Some(key) = secret(ENV_OPENAI_API_KEY) {
        config.analysis.api_key = key;
    }
    if let Some(password) = secret(ENV_ADMIN_PASSWORD) {
        config.admin.password = password;
    }
    config
}

fn or_string(value: String, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn or_path(value: PathBuf, fallback: PathBuf) -> PathBuf {
    if value.as_os_str().is_empty() {
        fallback
    } else {
        value
    }
}

fn or_nonzero<T: Default + PartialEq>(value: T, fallback: T) -> T {
    if value == T::default() {
        fallback
    } else {
        value
    }
}

fn merge_defaults(loaded: AppConfig, defaults: AppConfig) -> AppConfig {
    let AppConfig {
        github,
        storage,
        sync,
        deployment,
        analysis,
        admin,
    } = loaded;
    let d = defaults;

    AppConfig {
        github: mw_core::config::GithubConfig {
            owner: or_string(github.owner, d.github.owner),
            repo: or_string(github.repo, d.github.repo),
            branch: or_string(github.branch, d.github.branch),
            token: or_string(github.token, d.github.token),
            api_base: or_string(github.api_base, d.github.api_base),
            raw_host: or_string(github.raw_host, d.github.raw_host),
        },
        storage: mw_core::config::StorageConfig {
            database_path: or_path(storage.database_path, d.storage.database_path),
            log_dir: or_path(storage.log_dir, d.storage.log_dir),
        },
        sync: mw_core::config::SyncConfig {
            stale_after_secs: or_nonzero(sync.stale_after_secs, d.sync.stale_after_secs),
            max_attempts: or_nonzero(sync.max_attempts, d.sync.max_attempts),
            retry_backoff_ms: or_nonzero(sync.retry_backoff_ms, d.sync.retry_backoff_ms),
            request_timeout_secs: or_nonzero(
                sync.request_timeout_secs,
                d.sync.request_timeout_secs,
            ),
        },
        deployment: mw_core::config::DeploymentConfig {
            enabled: deployment.enabled,
            marker_dir: or_string(deployment.marker_dir, d.deployment.marker_dir),
        },
        analysis: mw_core::config::AnalysisConfig {
            endpoint: or_string(analysis.endpoint, d.analysis.endpoint),
            api_key: or_string(analysis.api_key, d.analysis.api_key),
            model: or_string(analysis.model, d.analysis.model),
        },
        admin: mw_core::config::AdminConfig {
            password: or_string(admin.password, d.admin.password),
        },
    }
}
