use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Limits applied to the URL list before anything is fetched
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Largest accepted URL list file
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: ByteSize,
    /// Longest accepted URL, in characters
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_url_length: default_max_url_length(),
        }
    }
}

fn default_max_file_bytes() -> ByteSize {
    ByteSize(100_000_000) // 100 MB
}

fn default_max_url_length() -> usize {
    4_000 // matches common reverse-proxy URL ceilings
}

/// Bounded work queue between the enqueuer and the workers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    5
}

/// Download worker pool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    5
}

/// Per-URL download behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Directory committed files (and staging files) are written to
    #[serde(default = "default_dest_dir")]
    pub dest_dir: PathBuf,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: ByteSize,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Skip TLS certificate verification.
    ///
    /// On by default: the tool fetches arbitrary public images and trades
    /// transport authenticity for reach. Set to `false` to verify certificates.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl DownloadConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dest_dir: default_dest_dir(),
            max_document_bytes: default_max_document_bytes(),
            max_redirects: default_max_redirects(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            accept_invalid_certs: default_accept_invalid_certs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_dest_dir() -> PathBuf {
    PathBuf::from("./downloads/")
}

fn default_max_document_bytes() -> ByteSize {
    ByteSize::mebibytes(3)
}

fn default_max_redirects() -> u32 {
    5
}

fn default_read_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("bulkfetch/{}", env!("CARGO_PKG_VERSION"))
}
