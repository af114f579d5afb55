//! Per-call performance samples.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default number of samples retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default number of recent samples in the rolling cache-hit rate.
pub const DEFAULT_HIT_RATE_WINDOW: usize = 20;

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultSource {
    /// Empty model; the dataset was returned as is.
    Passthrough,
    /// In-memory cache hit.
    Cache,
    /// Persistent store hit.
    PersistentCache,
    /// Evaluated inline.
    Inline,
    /// Evaluated on the worker.
    Worker,
}

impl ResultSource {
    pub fn is_cache_hit(self) -> bool {
        matches!(self, ResultSource::Cache | ResultSource::PersistentCache)
    }
}

/// One filter application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub duration_ms: f64,
    pub row_count: usize,
    pub result_count: usize,
    pub source: ResultSource,
    /// A persistent store was attached and read or written for this call.
    pub persistent_store_used: bool,
    /// Rolling cache-hit rate including this sample; filled in by
    /// [`MetricsRecorder::record`].
    pub cache_hit_rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceSample {
    pub fn cache_hit(&self) -> bool {
        self.source.is_cache_hit()
    }

    pub fn worker_used(&self) -> bool {
        self.source == ResultSource::Worker
    }
}

/// Aggregate view over the retained samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub sample_count: usize,
    pub average_duration_ms: f64,
    pub max_duration_ms: f64,
    /// Fraction of all retained samples served from either cache.
    pub cache_hit_rate: f64,
    /// Cache-hit fraction over the most recent window.
    pub rolling_hit_rate: f64,
    pub persistent_hit_rate: f64,
    /// Fraction of samples that read or wrote the persistent store.
    pub persistent_usage_rate: f64,
    pub worker_usage_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<PerformanceSample>,
}

/// Ring buffer of samples.
///
/// The rolling hit rate is informational; nothing adjusts cache sizing from it.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    samples: VecDeque<PerformanceSample>,
    capacity: usize,
    hit_rate_window: usize,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_HIT_RATE_WINDOW)
    }
}

impl MetricsRecorder {
    pub fn new(capacity: usize, hit_rate_window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            hit_rate_window: hit_rate_window.max(1),
        }
    }

    /// Appends a sample, stamping it with the rolling hit rate.
    pub fn record(&mut self, sample: PerformanceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        let rate = self.rolling_hit_rate();
        if let Some(last) = self.samples.back_mut() {
            last.cache_hit_rate = rate;
        }
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Cache-hit fraction over the last `hit_rate_window` samples.
    pub fn rolling_hit_rate(&self) -> f64 {
        let recent = self.samples.iter().rev().take(self.hit_rate_window);
        fraction(recent, PerformanceSample::cache_hit)
    }

    pub fn summary(&self) -> PerformanceMetrics {
        if self.samples.is_empty() {
            return PerformanceMetrics::default();
        }

        let count = self.samples.len();
        let total: f64 = self.samples.iter().map(|s| s.duration_ms).sum();
        let max = self
            .samples
            .iter()
            .map(|s| s.duration_ms)
            .fold(0.0_f64, f64::max);

        PerformanceMetrics {
            sample_count: count,
            average_duration_ms: total / count as f64,
            max_duration_ms: max,
            cache_hit_rate: fraction(self.samples.iter(), PerformanceSample::cache_hit),
            rolling_hit_rate: self.rolling_hit_rate(),
            persistent_hit_rate: fraction(self.samples.iter(), |s| {
                s.source == ResultSource::PersistentCache
            }),
            persistent_usage_rate: fraction(self.samples.iter(), |s| s.persistent_store_used),
            worker_usage_rate: fraction(self.samples.iter(), PerformanceSample::worker_used),
            last: self.samples.back().cloned(),
        }
    }
}

fn fraction<'a>(
    samples: impl Iterator<Item = &'a PerformanceSample>,
    predicate: impl Fn(&PerformanceSample) -> bool,
) -> f64 {
    let (hits, total) = samples.fold((0usize, 0usize), |(hits, total), s| {
        (hits + usize::from(predicate(s)), total + 1)
    });
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
