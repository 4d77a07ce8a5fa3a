use std::time::Duration;

use mw_core::config::AppConfig;

#[derive(Debug, Clone)]
pub struct GithubStoreConfig {
    pub api_base: String,
    pub raw_host: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    /// Upper bound on attempts for conflict and transient-failure retries.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `retry_backoff * 2^n`.
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
}

impl GithubStoreConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.github.api_base.trim_end_matches('/').to_string(),
            raw_host: config.github.raw_host.clone(),
            owner: config.github.owner.clone(),
            repo: config.github.repo.clone(),
            branch: config.github.branch.clone(),
            token: config.github.token.clone(),
            max_attempts: config.sync.max_attempts,
            retry_backoff: Duration::from_millis(config.sync.retry_backoff_ms),
            request_timeout: Duration::from_secs(config.sync.request_timeout_secs),
        }
    }

    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}
