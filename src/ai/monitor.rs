//! Per-scenario-kind health of the remote decision source

use crate::ai::scenario::ScenarioKind;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Health is judged on this many of the latest remote attempts
pub const HEALTH_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub success: bool,
    pub latency_ms: u64,
}

/// Lifetime totals plus a window of recent samples for one scenario kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindStats {
    pub attempts: u32,
    pub successes: u32,
    pub total_ms: u64,
    pub min_ms: Option<u64>,
    pub max_ms: u64,
    /// Oldest first, at most `HEALTH_WINDOW` long
    pub recent: VecDeque<Sample>,
    /// Decisions answered without asking the remote since the last sample
    pub idle: u32,
}

impl KindStats {
    /// Samples in the health window
    pub fn window_len(&self) -> u32 {
        self.recent.len() as u32
    }

    /// Success rate over the health window
    pub fn success_rate(&self) -> f64 {
        if self.recent.is_empty() {
            return 1.0;
        }
        let ok = self.recent.iter().filter(|s| s.success).count();
        ok as f64 / self.recent.len() as f64
    }

    /// Mean latency over the health window
    pub fn average_ms(&self) -> Option<u64> {
        let total: u64 = self.recent.iter().map(|s| s.latency_ms).sum();
        (!self.recent.is_empty()).then(|| total / self.recent.len() as u64)
    }

    pub(crate) fn record(&mut self, success: bool, latency_ms: u64) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
        self.total_ms += latency_ms;
        self.min_ms = Some(self.min_ms.map_or(latency_ms, |m| m.min(latency_ms)));
        self.max_ms = self.max_ms.max(latency_ms);

        if self.recent.len() == HEALTH_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(Sample { success, latency_ms });
        self.idle = 0;
    }
}

/// Owned by one AI session; two games never share statistics
#[derive(Debug, Clone, Default)]
pub struct PerformanceMonitor {
    stats: FxHashMap<ScenarioKind, KindStats>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ScenarioKind, success: bool, latency: Duration) {
        self.stats
            .entry(kind)
            .or_default()
            .record(success, latency.as_millis() as u64);
    }

    /// A decision of `kind` was made without the remote
    pub fn record_idle(&mut self, kind: ScenarioKind) {
        if let Some(stats) = self.stats.get_mut(&kind) {
            stats.idle += 1;
        }
    }

    pub fn health(&self, kind: ScenarioKind) -> Option<&KindStats> {
        self.stats.get(&kind)
    }

    /// One line per kind with data, in kind order
    pub fn summary(&self) -> Vec<String> {
        ScenarioKind::ALL
            .iter()
            .filter_map(|kind| {
                let s = self.stats.get(kind)?;
                Some(format!(
                    "{kind}: {}/{} ok, avg {} ms (min {}, max {}), last {} at {:.0}%",
                    s.successes,
                    s.attempts,
                    s.total_ms / u64::from(s.attempts.max(1)),
                    s.min_ms.unwrap_or(0),
                    s.max_ms,
                    s.recent.len(),
                    s.success_rate() * 100.0
                ))
            })
            .collect()
    }
}
