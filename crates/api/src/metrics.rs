use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    memory_hits: AtomicUsize,
    store_hits: AtomicUsize,
    artifacts_computed: AtomicUsize,
    fetch_failures: AtomicUsize,
    hard_failures: AtomicUsize,

    // Timing (in microseconds)
    total_fetch_time_us: AtomicU64,
    total_compute_time_us: AtomicU64,
    total_store_time_us: AtomicU64,

    // Counts
    total_bonds_inferred: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            memory_hits: AtomicUsize::new(0),
            store_hits: AtomicUsize::new(0),
            artifacts_computed: AtomicUsize::new(0),
            fetch_failures: AtomicUsize::new(0),
            hard_failures: AtomicUsize::new(0),
            total_fetch_time_us: AtomicU64::new(0),
            total_compute_time_us: AtomicU64::new(0),
            total_store_time_us: AtomicU64::new(0),
            total_bonds_inferred: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_hit(&self, duration: std::time::Duration) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
        self.total_store_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_fetch(&self, duration: std::time::Duration) {
        self.total_fetch_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_computed(&self, duration: std::time::Duration, bonds: usize) {
        self.artifacts_computed.fetch_add(1, Ordering::Relaxed);
        self.total_compute_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_bonds_inferred.fetch_add(bonds, Ordering::Relaxed);
    }

    pub fn record_store_write(&self, duration: std::time::Duration) {
        self.total_store_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_hard_failure(&self) {
        self.hard_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let computed = self.artifacts_computed.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            artifacts_computed: computed,
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            hard_failures: self.hard_failures.load(Ordering::Relaxed),
            avg_fetch_time_ms: avg_time_ms(&self.total_fetch_time_us, computed),
            avg_compute_time_ms: avg_time_ms(&self.total_compute_time_us, computed),
            total_bonds_inferred: self.total_bonds_inferred.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    if count > 0 {
        total / count as f64 / 1000.0
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub memory_hits: usize,
    pub store_hits: usize,
    pub artifacts_computed: usize,
    pub fetch_failures: usize,
    pub hard_failures: usize,
    pub avg_fetch_time_ms: f64,
    pub avg_compute_time_ms: f64,
    pub total_bonds_inferred: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
