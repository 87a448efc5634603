//! Per-URL event sink and run counters
//!
//! Components report per-URL outcomes through an [`EventSink`] instead of
//! calling `tracing` directly, so tests can observe exactly which lines a run
//! produced. [`TracingSink`] is the production sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Severity of a per-URL event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
}

/// Destination for per-URL outcome lines.
///
/// Each call emits exactly one line; implementations must be safe to call
/// from many workers at once.
pub trait EventSink: Send + Sync {
    fn emit(&self, level: EventLevel, url: &str, line: &str);

    fn info(&self, url: &str, line: &str) {
        self.emit(EventLevel::Info, url, line);
    }

    fn warn(&self, url: &str, line: &str) {
        self.emit(EventLevel::Warn, url, line);
    }
}

/// Forwards events to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, level: EventLevel, url: &str, line: &str) {
        match level {
            EventLevel::Info => tracing::info!(url, "{line}"),
            EventLevel::Warn => tracing::warn!(url, "{line}"),
        }
    }
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub level: EventLevel,
    pub url: String,
    pub line: String,
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self, level: EventLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .map(|event| event.line)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, level: EventLevel, url: &str, line: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Event {
                level,
                url: url.to_string(),
                line: line.to_string(),
            });
    }
}

/// Counters for a single pipeline run
#[derive(Debug, Default)]
pub struct Metrics {
    urls_accepted: AtomicU64,
    urls_rejected: AtomicU64,
    downloads_committed: AtomicU64,
    downloads_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_accepted(&self) {
        self.urls_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn url_rejected(&self) {
        self.urls_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn download_committed(&self) {
        self.downloads_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn download_failed(&self) {
        self.downloads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            urls_accepted: self.urls_accepted.load(Ordering::Relaxed),
            urls_rejected: self.urls_rejected.load(Ordering::Relaxed),
            downloads_committed: self.downloads_committed.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub urls_accepted: u64,
    pub urls_rejected: u64,
    pub downloads_committed: u64,
    pub downloads_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_sink_keeps_order_and_level() {
        let sink = MemorySink::new();
        sink.warn("http://a", "invalid url: \"a\"");
        sink.info("http://b", "downloaded: \"http://b\"");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, EventLevel::Warn);
        assert_eq!(events[1].url, "http://b");
        assert_eq!(sink.lines(EventLevel::Info), vec!["downloaded: \"http://b\""]);
    }

    #[test]
    fn test_memory_sink_concurrent_writers() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        sink.info("http://x", &format!("{i}-{j}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.events().len(), 400);
    }

    #[test]
    fn test_tracing_sink_is_object_safe() {
        let sink: Box<dyn EventSink> = Box::new(TracingSink);
        sink.info("http://example.com", "downloaded: \"http://example.com\"");
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = Metrics::new();
        metrics.url_accepted();
        metrics.url_accepted();
        metrics.url_rejected();
        metrics.download_committed();
        metrics.download_failed();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                urls_accepted: 2,
                urls_rejected: 1,
                downloads_committed: 1,
                downloads_failed: 1,
            }
        );
    }
}
