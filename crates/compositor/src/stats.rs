//! Composite counters and timing.
//!
//! Purely observational: nothing here influences what gets composited.

use crate::strategy::CompositeStrategy;
use serde::Serialize;
use std::time::Duration;

/// Weight of the previous average in the composite-time moving average.
const TIME_SMOOTHING: f64 = 0.9;

/// Compositor statistics.
#[derive(Clone, Debug, Default)]
pub struct CompositorStats {
    /// Composites that recomputed pixels.
    pub total_composites: u64,
    /// Full recomputes, background ones included.
    pub full_composites: u64,
    /// Incremental recomputes.
    pub incremental_composites: u64,
    /// Full recomputes that ran as background jobs.
    pub background_composites: u64,
    /// Requests answered from a fresh buffer.
    pub cache_hits: u64,
    /// Requests whose recompute ran to completion.
    pub cache_misses: u64,
    /// Exponential moving average of composite time in milliseconds.
    pub average_composite_time_ms: f64,
}

impl CompositorStats {
    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    /// Record a finished recompute.
    pub fn record_composite(&mut self, strategy: CompositeStrategy, elapsed: Duration) {
        self.total_composites += 1;
        match strategy {
            CompositeStrategy::Full => self.full_composites += 1,
            CompositeStrategy::Incremental => self.incremental_composites += 1,
            CompositeStrategy::Background => {
                self.full_composites += 1;
                self.background_composites += 1;
            }
        }

        let sample = elapsed.as_secs_f64() * 1000.0;
        self.average_composite_time_ms =
            self.average_composite_time_ms * TIME_SMOOTHING + sample * (1.0 - TIME_SMOOTHING);
    }

    /// Cache hits as a percentage of requests, 0 with no requests.
    pub fn cache_hit_ratio(&self) -> f64 {
        percentage(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Incremental recomputes as a percentage of recomputes, 0 with none.
    pub fn incremental_ratio(&self) -> f64 {
        percentage(self.incremental_composites, self.total_composites)
    }

    pub fn report(&self) -> PerformanceReport {
        PerformanceReport {
            total_composites: self.total_composites,
            full_composites: self.full_composites,
            incremental_composites: self.incremental_composites,
            background_composites: self.background_composites,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            cache_hit_ratio: self.cache_hit_ratio(),
            average_composite_time: self.average_composite_time_ms,
            incremental_ratio: self.incremental_ratio(),
        }
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Snapshot of the statistics with derived ratios.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub total_composites: u64,
    pub full_composites: u64,
    pub incremental_composites: u64,
    pub background_composites: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Percent, 0–100.
    pub cache_hit_ratio: f64,
    /// Milliseconds.
    pub average_composite_time: f64,
    /// Percent, 0–100.
    pub incremental_ratio: f64,
}
