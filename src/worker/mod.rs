//! Download workers
//!
//! A [`DownloadRunner`] spawns a fixed number of tokio tasks that pop URLs
//! from the shared queue and hand each one to a [`UrlDownloader`]. Failures
//! are reported through the event sink and never stop a worker.

pub mod downloader;
pub mod error;
pub mod http;
pub mod naming;
pub mod runner;

pub use downloader::UrlDownloader;
pub use error::DownloadError;
pub use http::{HttpConfig, build_client};
pub use runner::DownloadRunner;
