//! Transaction and worker metrics
//!
//! Counters are plain atomics owned by the coordinator or the worker that
//! records them, rendered on demand in Prometheus text format.

use crate::common::command::Phase;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Histogram bucket boundaries for latency measurements (in milliseconds)
const LATENCY_BUCKETS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// A simple histogram implementation for latency tracking
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<f64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with default latency buckets
    pub fn new() -> Self {
        Self::with_buckets(&LATENCY_BUCKETS)
    }

    /// Create a histogram with custom bucket boundaries
    pub fn with_buckets(boundaries: &[f64]) -> Self {
        let buckets = (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            boundaries: boundaries.to_vec(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a value in the histogram
    pub fn observe(&self, value: f64) {
        let bucket_idx = self
            .boundaries
            .iter()
            .position(|&boundary| value <= boundary)
            .unwrap_or(self.boundaries.len());

        self.buckets[bucket_idx].fetch_add(1, Ordering::Relaxed);
        // stored as microseconds
        self.sum
            .fetch_add((value * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative bucket counts, ending with the +Inf bucket
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0u64;
        let mut result = Vec::with_capacity(self.boundaries.len() + 1);

        for (i, &boundary) in self.boundaries.iter().enumerate() {
            cumulative += self.buckets[i].load(Ordering::Relaxed);
            result.push((boundary, cumulative));
        }

        cumulative += self.buckets[self.boundaries.len()].load(Ordering::Relaxed);
        result.push((f64::INFINITY, cumulative));

        result
    }

    /// Get sum of all observed values
    pub fn sum(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Get count of observations
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn write_prometheus(&self, out: &mut String, name: &str) -> std::fmt::Result {
        for (le, count) in self.get_buckets() {
            if le.is_infinite() {
                writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, count)?;
            } else {
                writeln!(out, "{}_bucket{{le=\"{}\"}} {}", name, le, count)?;
            }
        }
        writeln!(out, "{}_sum {}", name, self.sum())?;
        writeln!(out, "{}_count {}", name, self.count())
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Gauge for tracking current values
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

fn write_metric(out: &mut String, name: &str, kind: &str, help: &str, value: u64) -> std::fmt::Result {
    writeln!(out, "# HELP {} {}", name, help)?;
    writeln!(out, "# TYPE {} {}", name, kind)?;
    writeln!(out, "{} {}", name, value)
}

/// Outcome counters of the transaction coordinator
#[derive(Debug)]
pub struct CoordinatorMetrics {
    pub transactions: Counter,
    pub committed: Counter,
    pub aborted: Counter,
    pub commit_errors: Counter,
    pub rollback_errors: Counter,
    pub in_flight: Gauge,
    pub latency: Histogram,
    start_time: Instant,
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        Self {
            transactions: Counter::new(),
            committed: Counter::new(),
            aborted: Counter::new(),
            commit_errors: Counter::new(),
            rollback_errors: Counter::new(),
            in_flight: Gauge::new(),
            latency: Histogram::new(),
            start_time: Instant::now(),
        }
    }

    pub fn observe_duration(&self, duration: Duration) {
        self.latency.observe(duration.as_secs_f64() * 1000.0);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-compatible metrics output
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_prometheus(&mut out);
        out
    }

    fn write_prometheus(&self, out: &mut String) -> std::fmt::Result {
        write_metric(
            out,
            "kv2pc_transactions_total",
            "counter",
            "Client commands handled",
            self.transactions.get(),
        )?;
        write_metric(
            out,
            "kv2pc_transactions_committed_total",
            "counter",
            "Transactions that reached the commit phase",
            self.committed.get(),
        )?;
        write_metric(
            out,
            "kv2pc_transactions_aborted_total",
            "counter",
            "Transactions rolled back after a failed prepare",
            self.aborted.get(),
        )?;
        write_metric(
            out,
            "kv2pc_commit_errors_total",
            "counter",
            "Per-worker failures during commit",
            self.commit_errors.get(),
        )?;
        write_metric(
            out,
            "kv2pc_rollback_errors_total",
            "counter",
            "Per-worker failures during rollback",
            self.rollback_errors.get(),
        )?;
        write_metric(
            out,
            "kv2pc_transactions_in_flight",
            "gauge",
            "Transactions currently being coordinated",
            self.in_flight.get(),
        )?;
        write_metric(
            out,
            "kv2pc_uptime_seconds",
            "gauge",
            "Coordinator uptime in seconds",
            self.uptime_seconds(),
        )?;

        writeln!(
            out,
            "# HELP kv2pc_transaction_duration_ms Transaction duration in milliseconds"
        )?;
        writeln!(out, "# TYPE kv2pc_transaction_duration_ms histogram")?;
        self.latency
            .write_prometheus(out, "kv2pc_transaction_duration_ms")
    }
}

impl Default for CoordinatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-phase command counters of one worker
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    pub prepares: Counter,
    pub commits: Counter,
    pub rollbacks: Counter,
    pub commit_failures: Counter,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, phase: Phase) {
        match phase {
            Phase::Prepare => self.prepares.inc(),
            Phase::Commit => self.commits.inc(),
            Phase::Rollback => self.rollbacks.inc(),
        }
    }

    pub fn phase_count(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Prepare => self.prepares.get(),
            Phase::Commit => self.commits.get(),
            Phase::Rollback => self.rollbacks.get(),
        }
    }

    /// Prometheus text, including the current number of stored keys
    pub fn to_prometheus(&self, keys: usize) -> String {
        let mut out = String::new();
        let _ = self.write_prometheus(&mut out, keys);
        out
    }

    fn write_prometheus(&self, out: &mut String, keys: usize) -> std::fmt::Result {
        writeln!(
            out,
            "# HELP kv2pc_worker_commands_total Phase commands received"
        )?;
        writeln!(out, "# TYPE kv2pc_worker_commands_total counter")?;
        for phase in Phase::ALL {
            writeln!(
                out,
                "kv2pc_worker_commands_total{{phase=\"{}\"}} {}",
                phase,
                self.phase_count(phase)
            )?;
        }
        write_metric(
            out,
            "kv2pc_worker_commit_failures_total",
            "counter",
            "Commit tasks that failed to run",
            self.commit_failures.get(),
        )?;
        write_metric(
            out,
            "kv2pc_worker_keys",
            "gauge",
            "Keys held in the local store",
            keys as u64,
        )
    }
}
