//! Simulated processing delays.

use std::time::Duration;

use crate::Randomness;

/// Uniformly distributed processing delay.
///
/// The delay is a non-blocking sleep, so other messages keep flowing while
/// a stage "works".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub min: Duration,
    pub max: Duration,
}

impl Latency {
    /// No delay at all.
    pub const NONE: Latency = Latency {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub const fn millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// Draws a delay within the range.
    pub fn sample(&self, rng: &dyn Randomness) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rng.between(min, max))
    }

    /// Sleeps for a sampled delay.
    pub async fn simulate(&self, rng: &dyn Randomness) {
        let delay = self.sample(rng);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FastRandom, ScriptedRandomness};

    #[test]
    fn none_samples_zero() {
        let rng = FastRandom::seeded(1);
        assert_eq!(Latency::NONE.sample(&rng), Duration::ZERO);
    }

    #[test]
    fn sample_stays_in_range() {
        let rng = FastRandom::seeded(9);
        let latency = Latency::millis(500, 1500);
        for _ in 0..100 {
            let d = latency.sample(&rng);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn scripted_rng_takes_lower_bound() {
        let rng = ScriptedRandomness::all_succeed();
        assert_eq!(
            Latency::millis(300, 1000).sample(&rng),
            Duration::from_millis(300)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_sleeps_without_blocking() {
        let rng = ScriptedRandomness::all_succeed();
        let start = tokio::time::Instant::now();
        Latency::millis(700, 1900).simulate(&rng).await;
        assert!(start.elapsed() >= Duration::from_millis(700));
    }
}
