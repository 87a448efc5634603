//! Per-URL download state machine
//!
//! One call to [`UrlDownloader::download`] is one attempt: request, classify
//! the response, chase redirects while the budget lasts, stream a 2xx body into
//! a staging file, then either commit it under its final name or discard it.

use super::error::{DownloadError, Result};
use super::naming;
use crate::config::DownloadConfig;
use crate::observability::EventSink;
use crate::storage::{LocalStore, StagedFile};
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, StatusCode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Fetches single URLs into a [`LocalStore`]
#[derive(Clone)]
pub struct UrlDownloader {
    client: Client,
    store: LocalStore,
    sink: Arc<dyn EventSink>,
    max_document_bytes: u64,
    max_redirects: u32,
}

impl UrlDownloader {
    /// Create a downloader with the default document ceiling and redirect budget
    pub fn new(client: Client, store: LocalStore, sink: Arc<dyn EventSink>) -> Self {
        Self::from_config(&DownloadConfig::default(), client, store, sink)
    }

    pub fn from_config(
        config: &DownloadConfig,
        client: Client,
        store: LocalStore,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            client,
            store,
            sink,
            max_document_bytes: config.max_document_bytes.as_u64(),
            max_redirects: config.max_redirects,
        }
    }

    pub fn with_max_document_bytes(mut self, max_document_bytes: u64) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Download `url` with the configured redirect budget.
    ///
    /// Returns the path of the committed file. On success an info event naming
    /// `url` is emitted; failures are left for the caller to report.
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        self.download_with_budget(url, self.max_redirects).await
    }

    /// Download `url` following at most `budget` redirects
    pub async fn download_with_budget(&self, url: &str, budget: u32) -> Result<PathBuf> {
        let mut target = parse_http_url(url)?;
        let mut remaining = budget;

        loop {
            debug!(url, target = %target, remaining, "Requesting");
            let response = self.client.get(target.clone()).send().await?;
            let status = response.status();

            if status.is_success() {
                let dest = self.save(&target, response).await?;
                self.sink.info(url, &format!("downloaded: {url:?}"));
                return Ok(dest);
            }

            if status.is_redirection() {
                remaining = remaining
                    .checked_sub(1)
                    .ok_or(DownloadError::TooManyRedirects)?;
                let next = redirect_target(&target, &response)?;
                debug!(url, from = %target, to = %next, remaining, "Following redirect");
                target = next;
                continue;
            }

            return Err(classify_status(status));
        }
    }

    /// Stream a 2xx body into staging and finalize it
    async fn save(&self, target: &Url, mut response: Response) -> Result<PathBuf> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let name = naming::file_name(target, content_type.as_deref());

        let mut staged = self.store.stage()?;
        let streamed = self.stream(&mut response, &mut staged).await;

        match streamed {
            Ok(()) if staged.written() == 0 => {
                self.discard(staged);
                Err(DownloadError::EmptyDocument)
            }
            Ok(()) => {
                let dest = self.store.destination(&name);
                staged.commit(&dest).await?;
                Ok(dest)
            }
            Err(err) => {
                self.discard(staged);
                Err(err)
            }
        }
    }

    async fn stream(&self, response: &mut Response, staged: &mut StagedFile) -> Result<()> {
        while let Some(chunk) = response.chunk().await? {
            self.check_chunk(&chunk, staged.written())?;
            staged.write_chunk(&chunk).await?;
        }

        debug!(bytes = staged.written(), "Body streamed");
        Ok(())
    }

    /// Disk space first, then the running size total
    fn check_chunk(&self, chunk: &Bytes, written: u64) -> Result<()> {
        let chunk_len = chunk.len() as u64;

        if self.store.available_kb()? < chunk_len / 1000 {
            return Err(DownloadError::OutOfDiskSpace);
        }

        if written.saturating_add(chunk_len) > self.max_document_bytes {
            return Err(DownloadError::TooBigDocument {
                limit: self.max_document_bytes,
            });
        }

        Ok(())
    }

    fn discard(&self, staged: StagedFile) {
        if let Err(err) = staged.discard() {
            warn!(error = %err, "Failed to remove staging file");
        }
    }
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| DownloadError::InvalidInput(format!("{raw:?}: {e}")))?;
    ensure_http(url)
}

fn ensure_http(url: Url) -> Result<Url> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(DownloadError::InvalidInput(format!(
            "unsupported scheme {scheme:?}"
        ))),
    }
}

/// Resolve the `Location` header against the URL that produced it
fn redirect_target(current: &Url, response: &Response) -> Result<Url> {
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| DownloadError::InvalidInput("redirect without Location header".into()))?
        .to_str()
        .map_err(|_| DownloadError::InvalidInput("non-ASCII Location header".into()))?;

    let next = current
        .join(location)
        .map_err(|e| DownloadError::InvalidInput(format!("bad Location {location:?}: {e}")))?;
    ensure_http(next)
}

fn classify_status(status: StatusCode) -> DownloadError {
    if status.is_client_error() {
        DownloadError::ClientError { status }
    } else if status.is_server_error() {
        DownloadError::ServerError { status }
    } else {
        DownloadError::UnexpectedStatus { status }
    }
}
