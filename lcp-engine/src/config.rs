//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for network calls and device registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LcpConfig {
    /// Timeout of the network calls made while opening a license.
    pub status_timeout_secs: u64,
    /// Timeout of every other request.
    pub http_timeout_secs: u64,
    /// Device name sent to the status server. Defaults to the hostname.
    pub device_name: Option<String>,
    /// Register this device with the status server when a license is opened.
    pub register_on_open: bool,
    pub user_agent: String,
}

impl Default for LcpConfig {
    fn default() -> Self {
        Self {
            status_timeout_secs: 5,
            http_timeout_secs: 30,
            device_name: None,
            register_on_open: true,
            user_agent: concat!("lcp-engine/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LcpConfig {
    #[must_use]
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
