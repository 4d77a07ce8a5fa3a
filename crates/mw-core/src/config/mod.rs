//! # Configuration DTO
//!
//! Plain data mapped from TOML. Missing keys become empty values; nothing
//! here validates or fills in defaults. The binary's bootstrap layer merges
//! [`AppConfig::with_system_defaults`] over empty values and applies
//! environment overrides.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub deployment: DeploymentConfig,
    pub analysis: AnalysisConfig,
    pub admin: AdminConfig,
}

/// Repository used as the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub api_base: String,
    pub raw_host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncConfig {
    pub stale_after_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeploymentConfig {
    pub enabled: bool,
    pub marker_dir: String,
}

/// OpenAI-compatible captioning endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdminConfig {
    pub password: String,
}

fn str_at(value: &toml::Value, section: &str, key: &str) -> String {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn int_at(value: &toml::Value, section: &str, key: &str) -> i64 {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .unwrap_or(0)
}

fn bool_at(value: &toml::Value, section: &str, key: &str) -> bool {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

impl AppConfig {
    /// Map a parsed TOML document onto the DTO.
    ///
    /// Negative integers are treated as absent (zero).
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let unsigned = |section: &str, key: &str| int_at(toml_value, section, key).max(0) as u64;

        Ok(Self {
            github: GithubConfig {
                owner: str_at(toml_value, "github", "owner"),
                repo: str_at(toml_value, "github", "repo"),
                branch: str_at(toml_value, "github", "branch"),
                token: str_at(toml_value, "github", "token"),
                api_base: str_at(toml_value, "github", "api_base"),
                raw_host: str_at(toml_value, "github", "raw_host"),
            },
            storage: StorageConfig {
                database_path: PathBuf::from(str_at(toml_value, "storage", "database_path")),
                log_dir: PathBuf::from(str_at(toml_value, "storage", "log_dir")),
            },
            sync: SyncConfig {
                stale_after_secs: unsigned("sync", "stale_after_secs"),
                max_attempts: unsigned("sync", "max_attempts").min(u64::from(u32::MAX)) as u32,
                retry_backoff_ms: unsigned("sync", "retry_backoff_ms"),
                request_timeout_secs: unsigned("sync", "request_timeout_secs"),
            },
            deployment: DeploymentConfig {
                enabled: bool_at(toml_value, "deployment", "enabled"),
                marker_dir: str_at(toml_value, "deployment", "marker_dir"),
            },
            analysis: AnalysisConfig {
                endpoint: str_at(toml_value, "analysis", "endpoint"),
                api_key: str_at(toml_value, "analysis", "api_key"),
                model: str_at(toml_value, "analysis", "model"),
            },
            admin: AdminConfig {
                password: str_at(toml_value, "admin", "password"),
            },
        })
    }

    pub fn empty() -> Self {
        Self {
            github: GithubConfig::default(),
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
            deployment: DeploymentConfig::default(),
            analysis: AnalysisConfig::default(),
            admin: AdminConfig::default(),
        }
    }

    /// Production values rooted at `data_dir` (computed by the caller, e.g.
    /// with the `dirs` crate). Repository coordinates and secrets stay empty.
    pub fn with_system_defaults(data_dir: PathBuf) -> Self {
        Self {
            github: GithubConfig {
                branch: "main".to_string(),
                api_base: "https://api.github.com".to_string(),
                raw_host: "raw.githubusercontent.com".to_string(),
                ..GithubConfig::default()
            },
            storage: StorageConfig {
                database_path: data_dir.join("midweave.db"),
                log_dir: data_dir.join("logs"),
            },
            sync: SyncConfig {
                stale_after_secs: 300,
                max_attempts: 5,
                retry_backoff_ms: 500,
                request_timeout_secs: 30,
            },
            deployment: DeploymentConfig {
                enabled: false,
                marker_dir: "data/.deployment".to_string(),
            },
            analysis: AnalysisConfig {
                endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
            },
            admin: AdminConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn test_from_toml_reads_all_sections() {
        let toml_str = r#"
            [github]
            owner = "octo"
            repo = "gallery"
            branch = "content"
            token = "ghp_x"

            [storage]
            database_path = "/var/lib/midweave/cache.db"

            [sync]
            stale_after_secs = 60
            max_attempts = 3

            [deployment]
            enabled = true
            marker_dir = ".github/deployment-markers"

            [analysis]
            model = "gpt-4o"

            [admin]
            password = "hunter2"
        "#;
        let value: Value = toml::from_str(toml_str).unwrap();

        let config = AppConfig::from_toml(&value).unwrap();

        assert_eq!(config.github.owner, "octo");
        assert_eq!(config.github.branch, "content");
        assert_eq!(
            config.storage.database_path,
            PathBuf::from("/var/lib/midweave/cache.db")
        );
        assert_eq!(config.sync.stale_after_secs, 60);
        assert_eq!(config.sync.max_attempts, 3);
        assert!(config.deployment.enabled);
        assert_eq!(config.deployment.marker_dir, ".github/deployment-markers");
        assert_eq!(config.analysis.model, "gpt-4o");
        assert_eq!(config.admin.password, "hunter2");
    }

    #[test]
    fn test_from_toml_keeps_missing_values_empty() {
        let value: Value = toml::from_str("[github]\nowner = \"octo\"").unwrap();

        let config = AppConfig::from_toml(&value).unwrap();

        assert_eq!(config.github.branch, "");
        assert_eq!(config.sync.max_attempts, 0);
        assert!(!config.deployment.enabled);
        assert_eq!(config.storage.database_path, PathBuf::new());
    }

    #[test]
    fn test_from_toml_treats_negative_numbers_as_absent() {
        let value: Value = toml::from_str("[sync]\nretry_backoff_ms = -5").unwrap();
        let config = AppConfig::from_toml(&value).unwrap();
        assert_eq!(config.sync.retry_backoff_ms, 0);
    }

    #[test]
    fn test_with_system_defaults_roots_paths_in_data_dir() {
        let config = AppConfig::with_system_defaults(PathBuf::from("/tmp/mw"));

        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/mw/midweave.db"));
        assert_eq!(config.storage.log_dir, PathBuf::from("/tmp/mw/logs"));
        assert_eq!(config.github.branch, "main");
        assert_eq!(config.sync.stale_after_secs, 300);
        assert_eq!(config.analysis.model, "gpt-4o-mini");
        assert!(config.github.token.is_empty());
    }

    #[test]
    fn test_empty_is_all_blank() {
        let config = AppConfig::empty();
        assert_eq!(config.github, GithubConfig::default());
        assert_eq!(config.sync.request_timeout_secs, 0);
    }
}
