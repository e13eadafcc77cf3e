//! Percentage sampling for rate-limited sinks
//!
//! Remote sinks (syslog, Loggly) are expensive, so Info/Warn/Error events
//! reach them only with probability `rate / 100`. Emergency events always
//! pass.
//!
//! The sampler owns one generator for the lifetime of the client, seeded once
//! from OS entropy (or from a fixed seed in tests), so rapid successive calls
//! draw independent values.
//!
//! # Example
//!
//! ```
//! use logler::{LogSampler, Severity};
//!
//! let sampler = LogSampler::new(100);
//! assert!(sampler.should_sample(Severity::Info));
//!
//! let sampler = LogSampler::new(0);
//! assert!(!sampler.should_sample(Severity::Warn));
//! assert!(sampler.should_sample(Severity::Emergency));
//! ```

use super::severity::Severity;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

/// Highest meaningful sample rate; also the "never skip" fast path
pub const MAX_SAMPLE_RATE: u8 = 100;

/// Metrics for sampling observability
///
/// # Example
///
/// ```
/// use logler::SamplerMetrics;
///
/// let metrics = SamplerMetrics::new();
/// assert_eq!(metrics.sampled_count(), 0);
/// assert_eq!(metrics.skipped_count(), 0);
/// ```
#[derive(Debug)]
pub struct SamplerMetrics {
    sampled_count: AtomicU64,
    skipped_count: AtomicU64,
    total_count: AtomicU64,
}

impl SamplerMetrics {
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            skipped_count: AtomicU64::new(0),
            total_count: AtomicU64::new(0),
        }
    }

    /// Decisions that let the event through
    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    /// Decisions that kept the event away from the sink
    #[inline]
    pub fn skipped_count(&self) -> u64 {
        self.skipped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_sampled(&self) {
        self.sampled_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_skipped(&self) {
        self.skipped_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Observed pass ratio; 1.0 before any decision was made
    pub fn effective_sample_rate(&self) -> f64 {
        let sampled = self.sampled_count() as f64;
        let total = self.total_count() as f64;

        if total == 0.0 {
            1.0
        } else {
            sampled / total
        }
    }

    pub fn reset(&self) {
        self.sampled_count.store(0, Ordering::Relaxed);
        self.skipped_count.store(0, Ordering::Relaxed);
        self.total_count.store(0, Ordering::Relaxed);
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SamplerMetrics {
    fn clone(&self) -> Self {
        Self {
            sampled_count: AtomicU64::new(self.sampled_count()),
            skipped_count: AtomicU64::new(self.skipped_count()),
            total_count: AtomicU64::new(self.total_count()),
        }
    }
}

/// Decides whether a single remote write happens
///
/// Thread-safe. The generator sits behind a mutex that is only taken when a
/// real draw is needed (rate strictly between 0 and 100).
pub struct LogSampler {
    rate: u8,
    rng: Mutex<StdRng>,
    metrics: SamplerMetrics,
}

impl LogSampler {
    /// Create a sampler seeded from OS entropy. Rates above 100 are clamped.
    pub fn new(rate: u8) -> Self {
        Self::with_rng(rate, StdRng::from_entropy())
    }

    /// Create a sampler with a fixed seed for reproducible decisions
    pub fn with_seed(rate: u8, seed: u64) -> Self {
        Self::with_rng(rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rate: u8, rng: StdRng) -> Self {
        Self {
            rate: rate.min(MAX_SAMPLE_RATE),
            rng: Mutex::new(rng),
            metrics: SamplerMetrics::new(),
        }
    }

    /// Returns `true` if an event of `severity` should reach a sampled sink
    pub fn should_sample(&self, severity: Severity) -> bool {
        if severity.bypasses_sampling() || self.rate >= MAX_SAMPLE_RATE {
            self.metrics.record_sampled();
            return true;
        }

        if self.rate == 0 {
            self.metrics.record_skipped();
            return false;
        }

        // Uniform draw in [1, 100]; pass when it lands at or under the rate
        let draw: u8 = self.rng.lock().gen_range(1..=MAX_SAMPLE_RATE);
        let sample = draw <= self.rate;

        if sample {
            self.metrics.record_sampled();
        } else {
            self.metrics.record_skipped();
        }

        sample
    }

    pub fn rate(&self) -> u8 {
        self.rate
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for LogSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSampler")
            .field("rate", &self.rate)
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(LogSampler::new(250).rate(), 100);
        assert_eq!(LogSampler::new(37).rate(), 37);
    }

    #[test]
    fn test_rate_100_always_samples() {
        let sampler = LogSampler::new(100);
        for _ in 0..100 {
            assert!(sampler.should_sample(Severity::Info));
            assert!(sampler.should_sample(Severity::Warn));
            assert!(sampler.should_sample(Severity::Error));
        }
        assert_eq!(sampler.metrics().skipped_count(), 0);
    }

    #[test]
    fn test_rate_0_never_samples_except_emergency() {
        let sampler = LogSampler::new(0);
        for _ in 0..50 {
            assert!(!sampler.should_sample(Severity::Info));
            assert!(!sampler.should_sample(Severity::Error));
            assert!(sampler.should_sample(Severity::Emergency));
        }
        assert_eq!(sampler.metrics().sampled_count(), 50);
        assert_eq!(sampler.metrics().skipped_count(), 100);
    }

    #[test]
    fn test_rate_1_passes_rarely() {
        let sampler = LogSampler::with_seed(1, 7);
        let passed = (0..10_000)
            .filter(|_| sampler.should_sample(Severity::Info))
            .count();
        assert!((30..=200).contains(&passed), "passed {} of 10000", passed);
    }

    #[test]
    fn test_statistical_rate() {
        let sampler = LogSampler::new(50);
        let total = 10_000;
        let sampled = (0..total)
            .filter(|_| sampler.should_sample(Severity::Info))
            .count();

        let rate = sampled as f64 / total as f64;
        assert!(
            (0.45..=0.55).contains(&rate),
            "Expected ~50% sample rate, got {}%",
            rate * 100.0
        );
    }

    #[test]
    fn test_seeded_samplers_agree() {
        let a = LogSampler::with_seed(30, 42);
        let b = LogSampler::with_seed(30, 42);
        for _ in 0..500 {
            assert_eq!(
                a.should_sample(Severity::Warn),
                b.should_sample(Severity::Warn)
            );
        }
    }

    #[test]
    fn test_metrics_tracking() {
        let sampler = LogSampler::new(50);
        for _ in 0..100 {
            sampler.should_sample(Severity::Info);
        }

        let metrics = sampler.metrics();
        assert_eq!(metrics.total_count(), 100);
        assert_eq!(metrics.sampled_count() + metrics.skipped_count(), 100);

        metrics.reset();
        assert_eq!(metrics.total_count(), 0);
        assert_eq!(metrics.effective_sample_rate(), 1.0);
    }

    #[test]
    fn test_sampler_debug() {
        let debug_str = format!("{:?}", LogSampler::new(10));
        assert!(debug_str.contains("LogSampler"));
        assert!(debug_str.contains("rate"));
    }
}
