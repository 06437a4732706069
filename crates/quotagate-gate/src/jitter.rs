//! Randomized jitter for backoff sleeps.

use rand::Rng;
use std::time::Duration;

/// Jitter source for the gate's sleeps.
///
/// Jitter spreads synchronized workers apart so they do not hammer the
/// counter store in lockstep. Disabled jitter returns zero, which keeps
/// protocol tests deterministic.
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    enabled: bool,
}

impl Jitter {
    /// Jitter backed by the thread-local RNG.
    pub fn random() -> Self {
        Self { enabled: true }
    }

    /// Jitter that always returns zero.
    pub fn none() -> Self {
        Self { enabled: false }
    }

    /// A uniformly random duration in `[0, max)`.
    pub fn up_to(&self, max: Duration) -> Duration {
        if !self.enabled || max.is_zero() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(rand::rng().random_range(0.0..max.as_secs_f64()))
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::random()
    }
}
