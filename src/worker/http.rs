//! HTTP client used by every download worker

use crate::config::DownloadConfig;
use reqwest::{Client, redirect};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Longest wait for any single read from the peer
    pub read_timeout: Duration,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for HttpConfig {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            accept_invalid_certs: config.accept_invalid_certs,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Build the shared client.
///
/// Redirects are never followed automatically: the downloader chases them
/// itself so it can enforce its own budget.
pub fn build_client(config: &HttpConfig) -> reqwest::Result<Client> {
    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
    }

    let client = Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .user_agent(&config.user_agent)
        .redirect(redirect::Policy::none())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;

    debug!(
        read_timeout_secs = config.read_timeout.as_secs(),
        accept_invalid_certs = config.accept_invalid_certs,
        "HTTP client ready"
    );
    Ok(client)
}
