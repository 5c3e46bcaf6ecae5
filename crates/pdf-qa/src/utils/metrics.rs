use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Run counters, shared between chunk tasks.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_created: AtomicU64,
    answers_generated: AtomicU64,
    answer_failures: AtomicU64,
    answers_retained: AtomicU64,
    answers_rejected: AtomicU64,
    embedding_failures: AtomicU64,
    total_processing_time_ms: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub documents_processed: u64,
    pub documents_failed: u64,
    pub chunks_created: u64,
    pub answers_generated: u64,
    pub answer_failures: u64,
    pub answers_retained: u64,
    pub answers_rejected: u64,
    pub embedding_failures: u64,
    pub total_processing_time_ms: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                documents_processed: AtomicU64::new(0),
                documents_failed: AtomicU64::new(0),
                chunks_created: AtomicU64::new(0),
                answers_generated: AtomicU64::new(0),
                answer_failures: AtomicU64::new(0),
                answers_retained: AtomicU64::new(0),
                answers_rejected: AtomicU64::new(0),
                embedding_failures: AtomicU64::new(0),
                total_processing_time_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn increment_documents_processed(&self) {
        self.inner.documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_failed(&self) {
        self.inner.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_chunks_created(&self, count: u64) {
        self.inner.chunks_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_answers_generated(&self) {
        self.inner.answers_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_answer_failures(&self) {
        self.inner.answer_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_answers_retained(&self) {
        self.inner.answers_retained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_answers_rejected(&self) {
        self.inner.answers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_embedding_failures(&self) {
        self.inner.embedding_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_processing_time(&self, duration: Duration) {
        self.inner
            .total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        MetricsSnapshot {
            documents_processed: inner.documents_processed.load(Ordering::Relaxed),
            documents_failed: inner.documents_failed.load(Ordering::Relaxed),
            chunks_created: inner.chunks_created.load(Ordering::Relaxed),
            answers_generated: inner.answers_generated.load(Ordering::Relaxed),
            answer_failures: inner.answer_failures.load(Ordering::Relaxed),
            answers_retained: inner.answers_retained.load(Ordering::Relaxed),
            answers_rejected: inner.answers_rejected.load(Ordering::Relaxed),
            embedding_failures: inner.embedding_failures.load(Ordering::Relaxed),
            total_processing_time_ms: inner.total_processing_time_ms.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            documents_processed = s.documents_processed,
            documents_failed = s.documents_failed,
            chunks_created = s.chunks_created,
            answers_generated = s.answers_generated,
            answer_failures = s.answer_failures,
            answers_retained = s.answers_retained,
            answers_rejected = s.answers_rejected,
            embedding_failures = s.embedding_failures,
            total_time_s = s.total_processing_time_ms as f64 / 1000.0,
            "📊 Run summary"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer helper untuk measure duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
