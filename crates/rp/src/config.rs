// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Relying-party settings consumed read-only by the client core.
#[derive(Debug, Clone, PartialEq, Eq, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Identity provider (STS) base URL.
    #[arg(long, default_value = "", env = "OIDC_RP_STS_SERVER")]
    #[serde(default)]
    pub sts_server: String,

    /// Client identifier registered at the provider.
    #[arg(long, default_value = "", env = "OIDC_RP_CLIENT_ID")]
    #[serde(default)]
    pub client_id: String,

    /// Monitor the provider session through the check-session frame.
    #[arg(long, env = "OIDC_RP_START_CHECK_SESSION")]
    #[serde(default)]
    pub start_check_session: bool,

    /// Silent renew is handled by an external collaborator.
    #[arg(long, env = "OIDC_RP_SILENT_RENEW")]
    #[serde(default)]
    pub silent_renew: bool,

    /// Seconds before actual expiry at which tokens already count as expired.
    #[arg(long, default_value_t = 0, env = "OIDC_RP_RENEW_TIME_BEFORE_EXPIRY_SECS")]
    #[serde(default)]
    pub renew_time_before_token_expires_in_seconds: u64,

    /// Check-session endpoint from the provider's well-known document.
    #[arg(long, env = "OIDC_RP_CHECK_SESSION_IFRAME")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_session_iframe: Option<String>,

    /// Periodic token validation cadence in seconds.
    #[arg(long, default_value_t = 3, env = "OIDC_RP_TOKEN_REFRESH_INTERVAL_SECS")]
    #[serde(default = "default_token_refresh_interval_secs")]
    pub token_refresh_interval_secs: u64,
}

fn default_token_refresh_interval_secs() -> u64 {
    3
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sts_server: String::new(),
            client_id: String::new(),
            start_check_session: false,
            silent_renew: false,
            renew_time_before_token_expires_in_seconds: 0,
            check_session_iframe: None,
            token_refresh_interval_secs: default_token_refresh_interval_secs(),
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file (camelCase keys).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn has_valid_config(&self) -> bool {
        !self.sts_server.is_empty() && !self.client_id.is_empty()
    }

    /// Exact origin (`scheme://host[:port]`) of the STS server.
    ///
    /// Returns `None` when the URL does not parse or has an opaque origin.
    pub fn sts_origin(&self) -> Option<String> {
        let url = url::Url::parse(&self.sts_server).ok()?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return None;
        }
        Some(origin.ascii_serialization())
    }

    /// Validation period; clamped to at least one second.
    pub fn token_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.token_refresh_interval_secs.max(1))
    }
}

/// Command line for the `oidc-rp` inspection binary.
#[derive(Debug, Parser)]
#[command(name = "oidc-rp", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientConfig,

    /// JSON config file; overrides the client flags when given.
    #[arg(long, env = "OIDC_RP_CONFIG")]
    pub config: Option<PathBuf>,

    /// File-backed token store to restore from.
    #[arg(long, env = "OIDC_RP_STORE")]
    pub store: PathBuf,

    /// Run periodic validation for this many seconds before exiting.
    #[arg(long, default_value_t = 0, env = "OIDC_RP_WATCH_SECS")]
    pub watch_secs: u64,

    /// Log format (json or text).
    #[arg(long, env = "OIDC_RP_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "OIDC_RP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Resolve the effective client config (file wins over flags).
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        match self.config {
            Some(ref path) => ClientConfig::load(path),
            None => Ok(self.client.clone()),
        }
    }

    pub fn watch_duration(&self) -> Duration {
        Duration::from_secs(self.watch_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
