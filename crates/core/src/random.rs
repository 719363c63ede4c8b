use std::time::Duration;

use rand::Rng;

/// Uniform duration source for randomized scheduling intervals.
///
/// The scheduler draws from this for every `*_range` operation; hosts can
/// plug a seeded or fixed implementation for replayable runs.
pub trait DurationSampler {
    /// Draw a duration uniformly from `[min, max]`.
    fn sample_between(&mut self, min: Duration, max: Duration) -> Duration;
}

/// Samples from the thread-local RNG (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSampler;

impl DurationSampler for ThreadRngSampler {
    fn sample_between(&mut self, min: Duration, max: Duration) -> Duration {
        debug_assert!(min <= max, "sample_between called with min > max");
        if min >= max {
            return min;
        }
        let nanos = rand::thread_rng().gen_range(min.as_nanos()..=max.as_nanos());
        Duration::from_nanos(nanos as u64)
    }
}

/// Always returns the same duration, clamped into `[min, max]`.
///
/// Useful for tests and hosts that want randomized call sites without
/// randomized behavior.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler {
    value: Duration,
}

impl FixedSampler {
    pub fn new(value: Duration) -> Self {
        Self { value }
    }
}

impl DurationSampler for FixedSampler {
    fn sample_between(&mut self, min: Duration, max: Duration) -> Duration {
        debug_assert!(min <= max, "sample_between called with min > max");
        self.value.clamp(min, max)
    }
}
