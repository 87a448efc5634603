//! Producer side of the pipeline: URL list → validator → queue

use super::bounded::{BoundedQueue, CloseOnDrop, QueueError};
use crate::observability::{EventSink, Metrics};
use crate::validation::UrlValidator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("Failed to open URL list {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read URL list: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to enqueue URL: {0}")]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, EnqueueError>;

/// Counts for one scan of the URL list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueSummary {
    pub accepted: usize,
    pub rejected: usize,
}

/// Reads whitespace-separated tokens and pushes the valid URLs
pub struct UrlEnqueuer {
    validator: UrlValidator,
    sink: Arc<dyn EventSink>,
    metrics: Arc<Metrics>,
}

impl UrlEnqueuer {
    pub fn new(validator: UrlValidator, sink: Arc<dyn EventSink>, metrics: Arc<Metrics>) -> Self {
        Self {
            validator,
            sink,
            metrics,
        }
    }

    /// Scan the file at `source` into `queue`.
    ///
    /// The queue is closed when this returns, whatever the outcome, so
    /// consumers can tell "temporarily empty" from "done".
    pub async fn run(&self, source: &Path, queue: &BoundedQueue<String>) -> Result<EnqueueSummary> {
        let _close = CloseOnDrop(queue);

        let file = File::open(source).await.map_err(|source_err| EnqueueError::Open {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        // The file handle is released when the reader goes out of scope
        self.run_reader(BufReader::new(file), queue).await
    }

    /// Scan any buffered reader into `queue`, closing the queue at the end
    pub async fn run_reader<R>(&self, mut reader: R, queue: &BoundedQueue<String>) -> Result<EnqueueSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let _close = CloseOnDrop(queue);
        let mut summary = EnqueueSummary::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            for token in line.split_whitespace() {
                self.process_token(token, queue, &mut summary).await?;
            }
        }

        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "URL list exhausted"
        );
        Ok(summary)
    }

    async fn process_token(
        &self,
        token: &str,
        queue: &BoundedQueue<String>,
        summary: &mut EnqueueSummary,
    ) -> Result<()> {
        let token = token.trim();

        if self.validator.is_valid(token) {
            queue.push(token.to_string()).await?;
            summary.accepted += 1;
            self.metrics.url_accepted();
            debug!(url = token, queued = queue.len(), "URL enqueued");
        } else {
            summary.rejected += 1;
            self.metrics.url_rejected();
            self.sink.warn(token, &format!("invalid url: {token:?}"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{EventLevel, MemorySink};
    use std::fs;
    use tempfile::TempDir;

    fn enqueuer(sink: Arc<MemorySink>) -> UrlEnqueuer {
        UrlEnqueuer::new(UrlValidator::new(4000), sink, Arc::new(Metrics::new()))
    }

    async fn drain(queue: &BoundedQueue<String>) -> Vec<String> {
        let mut items = Vec::new();
        while let Some(item) = queue.pop().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_pushes_valid_urls_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("urls.txt");
        fs::write(&path, "http://url1 http://url2  invalid_url\n").unwrap();

        let sink = Arc::new(MemorySink::new());
        let queue = BoundedQueue::new(4);

        let summary = enqueuer(Arc::clone(&sink)).run(&path, &queue).await.unwrap();

        assert_eq!(summary, EnqueueSummary { accepted: 2, rejected: 1 });
        assert!(queue.is_closed());
        assert_eq!(drain(&queue).await, vec!["http://url1", "http://url2"]);
        assert_eq!(
            sink.lines(EventLevel::Warn),
            vec!["invalid url: \"invalid_url\""]
        );
    }

    #[tokio::test]
    async fn test_mixed_separators() {
        let sink = Arc::new(MemorySink::new());
        let queue = BoundedQueue::new(8);
        let input = "http://a/1.png\r\n\thttp://b/2.png   http://c/3.png\n\n\nhttp://d/4.png";

        let summary = enqueuer(sink)
            .run_reader(input.as_bytes(), &queue)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 4);
        assert_eq!(
            drain(&queue).await,
            vec!["http://a/1.png", "http://b/2.png", "http://c/3.png", "http://d/4.png"]
        );
    }

    #[tokio::test]
    async fn test_rejections_do_not_stop_the_scan() {
        let sink = Arc::new(MemorySink::new());
        let queue = BoundedQueue::new(8);
        let input = "javascript:alert(1) http://ok/1 ftp://nope http://ok/2";

        let summary = enqueuer(Arc::clone(&sink))
            .run_reader(input.as_bytes(), &queue)
            .await
            .unwrap();

        assert_eq!(summary, EnqueueSummary { accepted: 2, rejected: 2 });
        assert_eq!(sink.lines(EventLevel::Warn).len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_still_closes_queue() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let queue = BoundedQueue::new(1);

        let result = enqueuer(sink)
            .run(&temp_dir.path().join("missing.txt"), &queue)
            .await;

        assert!(matches!(result, Err(EnqueueError::Open { .. })));
        assert!(queue.is_drained());
    }

    #[tokio::test]
    async fn test_producer_waits_for_consumer() {
        let sink = Arc::new(MemorySink::new());
        let queue = Arc::new(BoundedQueue::new(1));
        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                enqueuer(sink)
                    .run_reader("http://a http://b http://c".as_bytes(), &queue)
                    .await
            })
        };

        let items = drain(&queue).await;
        let summary = producer.await.unwrap().unwrap();

        assert_eq!(items, vec!["http://a", "http://b", "http://c"]);
        assert_eq!(summary.accepted, 3);
    }
}
