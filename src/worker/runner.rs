//! Download runner - drains the queue with a fixed set of workers

use super::downloader::UrlDownloader;
use crate::observability::{EventSink, Metrics};
use crate::queue::BoundedQueue;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info};

/// Fixed pool of workers sharing one downloader and one queue
#[derive(Clone)]
pub struct DownloadRunner {
    downloader: UrlDownloader,
    queue: Arc<BoundedQueue<String>>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<Metrics>,
}

impl DownloadRunner {
    pub fn new(
        downloader: UrlDownloader,
        queue: Arc<BoundedQueue<String>>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            downloader,
            queue,
            sink,
            metrics,
        }
    }

    /// Spawn `count` workers; each exits once the queue is closed and drained
    pub fn spawn(&self, count: usize) -> Vec<JoinHandle<usize>> {
        (0..count)
            .map(|worker_id| {
                let runner = self.clone();
                tokio::spawn(
                    async move { runner.run_worker(worker_id).await }.in_current_span(),
                )
            })
            .collect()
    }

    /// Take URLs until the queue is permanently empty.
    ///
    /// A failed download, including one that panics, is reported as one
    /// warning line and never stops the worker. Returns the number of URLs
    /// this worker handled.
    pub async fn run_worker(&self, worker_id: usize) -> usize {
        debug!(worker_id, "Worker started");
        let mut handled = 0;

        while let Some(url) = self.queue.pop().await {
            handled += 1;
            self.process(worker_id, &url).await;
        }

        info!(worker_id, handled, "Worker finished");
        handled
    }

    async fn process(&self, worker_id: usize, url: &str) {
        // Each attempt runs in its own task so a panic stays confined to it
        let attempt = {
            let downloader = self.downloader.clone();
            let url = url.to_string();
            tokio::spawn(async move { downloader.download(&url).await }.in_current_span())
        };

        match attempt.await {
            Ok(Ok(dest)) => {
                self.metrics.download_committed();
                debug!(worker_id, url, dest = %dest.display(), "Download committed");
            }
            Ok(Err(err)) => {
                self.metrics.download_failed();
                debug!(worker_id, url, kind = err.kind(), "Download failed");
                self.sink.warn(url, &err.report_line(url));
            }
            Err(join_err) => {
                self.metrics.download_failed();
                let kind = if join_err.is_panic() { "Panic" } else { "Cancelled" };
                error!(worker_id, url, kind, "Download task aborted");
                self.sink
                    .warn(url, &format!("{url:?} - {kind}: download task aborted"));
            }
        }
    }
}
