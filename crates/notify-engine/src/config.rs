use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notify_types::NotifyConfig;

use crate::error::EngineError;

/// Canonical constants (spec.md §6). `keyserver_url`/`notify_server_url`
/// are overridable for tests; the separator and default expiry are fixed
/// protocol choices, not deployment knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub keyserver_url: String,
    pub notify_server_url: String,
    pub explorer_api_base: String,
    pub project_id: String,
    pub subscription_expiry_days: i64,
}

/// Joined with a single ASCII space inside the JWT `scp` claim.
pub const SCOPE_SEPARATOR: &str = " ";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keyserver_url: "https://keys.walletconnect.com".to_string(),
            notify_server_url: "https://notify.walletconnect.com".to_string(),
            explorer_api_base: "https://explorer-api.walletconnect.com/w3i/v1".to_string(),
            project_id: String::new(),
            subscription_expiry_days: 30,
        }
    }
}

/// Fetches a dapp's notify-config document (spec.md §6), tolerated to fail
/// — reconciliation falls back to the raw domain as metadata.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch(&self, app_domain: &str) -> Result<Option<NotifyConfig>, EngineError>;
}

pub struct ExplorerApiConfigFetcher {
    http: reqwest::Client,
    explorer_api_base: String,
    project_id: String,
}

impl ExplorerApiConfigFetcher {
    pub fn new(explorer_api_base: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            explorer_api_base: explorer_api_base.into(),
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl ConfigFetcher for ExplorerApiConfigFetcher {
    async fn fetch(&self, app_domain: &str) -> Result<Option<NotifyConfig>, EngineError> {
        let url = format!(
            "{}/notify-config?projectId={}&appDomain={}",
            self.explorer_api_base, self.project_id, app_domain
        );
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(app_domain, error = %e, "notify-config fetch failed, tolerating");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            tracing::warn!(app_domain, status = %response.status(), "notify-config fetch failed, tolerating");
            return Ok(None);
        }
        match response.json::<NotifyConfig>().await {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                tracing::warn!(app_domain, error = %e, "notify-config decode failed, tolerating");
                Ok(None)
            }
        }
    }
}

/// Injected so the watch reconnect policy (spec.md §4.1) is testable
/// without real wall-clock delays.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
