//! Pipeline orchestrator
//!
//! Validates the URL list, then runs one enqueuer task and a fixed pool of
//! download workers over a shared bounded queue until the list is exhausted
//! and every queued URL has been handled. Per-URL outcomes only reach the
//! event sink; the returned error is reserved for run-level failures.

use crate::config::Config;
use crate::observability::{EventSink, Metrics, MetricsSnapshot};
use crate::queue::{BoundedQueue, EnqueueError, EnqueueSummary, UrlEnqueuer};
use crate::storage::{LocalStore, SpaceProbe, StatvfsProbe, StorageError};
use crate::validation::{FileValidationError, FileValidator, UrlValidator};
use crate::worker::{DownloadRunner, HttpConfig, UrlDownloader, build_client};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    File(#[from] FileValidationError),

    #[error("Destination unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Outcome counters of a finished run
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub run_id: Uuid,
    pub metrics: MetricsSnapshot,
}

pub struct Pipeline {
    config: Config,
    sink: Arc<dyn EventSink>,
    probe: Arc<dyn SpaceProbe>,
}

impl Pipeline {
    pub fn new(config: Config, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            probe: Arc::new(StatvfsProbe),
        }
    }

    /// Replace the disk space probe used for the destination directory
    pub fn with_space_probe(mut self, probe: Arc<dyn SpaceProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Download every valid URL listed in `source`.
    ///
    /// Fails only if the file itself is rejected, the destination directory
    /// cannot be prepared, or the HTTP client cannot be built.
    pub async fn run(&self, source: &Path) -> Result<RunReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!("run", %run_id);

        let metrics = self.run_inner(source).instrument(span).await?;
        Ok(RunReport { run_id, metrics })
    }

    async fn run_inner(&self, source: &Path) -> Result<MetricsSnapshot> {
        self.file_validator().validate(source)?;

        let download = &self.config.download;
        let store = LocalStore::with_probe(&download.dest_dir, Arc::clone(&self.probe))?;
        let client = build_client(&HttpConfig::from(download))?;

        info!(
            source = %source.display(),
            dest = %store.root().display(),
            workers = self.config.workers.count,
            queue_capacity = self.config.queue.capacity,
            "Starting run"
        );

        let metrics = Arc::new(Metrics::new());
        let queue = Arc::new(BoundedQueue::new(self.config.queue.capacity));

        let producer = {
            let enqueuer = self.enqueuer(Arc::clone(&metrics));
            let queue = Arc::clone(&queue);
            let source = source.to_path_buf();
            tokio::spawn(async move { enqueuer.run(&source, &queue).await }.in_current_span())
        };

        let downloader =
            UrlDownloader::from_config(download, client, store, Arc::clone(&self.sink));
        let runner = DownloadRunner::new(
            downloader,
            Arc::clone(&queue),
            Arc::clone(&self.sink),
            Arc::clone(&metrics),
        );
        let workers = runner.spawn(self.config.workers.count);

        for (worker_id, handle) in workers.into_iter().enumerate() {
            if let Err(err) = handle.await {
                error!(worker_id, error = %err, "Worker task failed");
            }
        }

        // Unblocks the producer if no worker is left to drain the queue
        queue.close();

        match producer.await {
            Ok(Ok(summary)) => debug!(?summary, "Enqueuer finished"),
            Ok(Err(err)) => error!(error = %err, "Enqueuer stopped early"),
            Err(err) => error!(error = %err, "Enqueuer task failed"),
        }

        let snapshot = metrics.snapshot();
        info!(
            accepted = snapshot.urls_accepted,
            rejected = snapshot.urls_rejected,
            downloaded = snapshot.downloads_committed,
            failed = snapshot.downloads_failed,
            "Run finished"
        );
        Ok(snapshot)
    }

    /// Validate `source` and count the tokens the enqueuer would accept,
    /// without any network traffic. Rejected tokens are still reported.
    pub async fn check(&self, source: &Path) -> Result<EnqueueSummary> {
        self.file_validator().validate(source)?;

        let queue = Arc::new(BoundedQueue::new(self.config.queue.capacity));
        let drain = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { while queue.pop().await.is_some() {} })
        };

        let summary = self
            .enqueuer(Arc::new(Metrics::new()))
            .run(source, &queue)
            .await;

        if let Err(err) = drain.await {
            error!(error = %err, "Drain task failed");
        }
        Ok(summary?)
    }

    fn file_validator(&self) -> FileValidator {
        FileValidator::new(self.config.input.max_file_bytes.as_u64())
    }

    fn enqueuer(&self, metrics: Arc<Metrics>) -> UrlEnqueuer {
        UrlEnqueuer::new(
            UrlValidator::new(self.config.input.max_url_length),
            Arc::clone(&self.sink),
            metrics,
        )
    }
}
