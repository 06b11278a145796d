//! In-process metrics behind `GET /api/translate/stats`: latency windows for
//! upstream calls and whole requests, plus event counters. Nothing is exported.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Observations kept per latency metric.
const WINDOW: usize = 512;

/// Measures one operation; records into the registry on `finish`.
#[must_use = "a latency timer records nothing until finished"]
pub struct LatencyTimer {
    metric: &'static str,
    started: Instant,
    registry: Arc<MetricsRegistry>,
}

impl LatencyTimer {
    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        self.registry.observe(self.metric, elapsed);
        elapsed
    }
}

/// The most recent `WINDOW` observations of one metric, plus a lifetime count.
#[derive(Default)]
struct LatencyWindow {
    recent: VecDeque<Duration>,
    observed: u64,
}

impl LatencyWindow {
    fn push(&mut self, elapsed: Duration) {
        if self.recent.len() == WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(elapsed);
        self.observed += 1;
    }

    fn summarize(&self) -> LatencySummary {
        let mut sorted: Vec<Duration> = self.recent.iter().copied().collect();
        sorted.sort_unstable();

        let millis = |q: f64| nearest_rank(&sorted, q).as_secs_f64() * 1000.0;
        LatencySummary {
            count: self.observed,
            p50_ms: millis(0.50),
            p95_ms: millis(0.95),
            p99_ms: millis(0.99),
        }
    }
}

/// `q` in `0.0..=1.0`; zero for an empty window.
fn nearest_rank(sorted: &[Duration], q: f64) -> Duration {
    let Some(last) = sorted.len().checked_sub(1) else {
        return Duration::ZERO;
    };
    let rank = (q.clamp(0.0, 1.0) * last as f64).round() as usize;
    sorted[rank.min(last)]
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Default)]
pub struct MetricsRegistry {
    latencies: Mutex<HashMap<&'static str, LatencyWindow>>,
    counters: Mutex<HashMap<&'static str, u64>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, metric: &'static str, elapsed: Duration) {
        self.latencies.lock().entry(metric).or_default().push(elapsed);
        tracing::trace!(metric, elapsed_ms = elapsed.as_millis() as u64, "latency observed");
    }

    pub fn start_timer(self: &Arc<Self>, metric: &'static str) -> LatencyTimer {
        LatencyTimer {
            metric,
            started: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    pub fn incr(&self, name: &'static str, by: u64) {
        *self.counters.lock().entry(name).or_insert(0) += by;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// Per-metric latency summary, keyed by metric name in a stable order.
    pub fn latency_summary(&self) -> BTreeMap<&'static str, LatencySummary> {
        self.latencies
            .lock()
            .iter()
            .map(|(&metric, window)| (metric, window.summarize()))
            .collect()
    }
}

pub mod metric_names {
    // latencies
    pub const UPSTREAM_CALL: &str = "upstream_call";
    pub const TRANSLATE_REQUEST: &str = "translate_request";
    // counters
    pub const UPSTREAM_CALLS: &str = "upstream_calls";
    pub const UPSTREAM_FAILURES: &str = "upstream_failures";
    pub const FALLBACK_TEXTS: &str = "fallback_texts";
}
