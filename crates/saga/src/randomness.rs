//! Injectable source of randomness for simulated outcomes.
//!
//! Production wiring uses [`FastRandom`]. Tests use [`ScriptedRandomness`]
//! to force each stage's outcome, or a seeded [`FastRandom`] for
//! statistical checks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Saga stage whose outcome is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Payment,
    Inventory,
    Shipping,
    Notification,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Payment => "payment",
            Stage::Inventory => "inventory",
            Stage::Shipping => "shipping",
            Stage::Notification => "notification",
        }
    }
}

/// Random decisions made by the simulated services.
pub trait Randomness: Send + Sync {
    /// Returns true with the given probability.
    fn succeeds(&self, stage: Stage, probability: f64) -> bool;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick(&self, len: usize) -> usize;

    /// Uniform integer in `low..=high`.
    fn between(&self, low: u64, high: u64) -> u64;
}

/// Builds a string of `len` characters drawn from `alphabet`.
pub fn random_string(rng: &dyn Randomness, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| char::from(alphabet[rng.pick(alphabet.len())]))
        .collect()
}

/// Randomness backed by `fastrand`.
pub struct FastRandom {
    rng: Mutex<fastrand::Rng>,
}

impl FastRandom {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut fastrand::Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl Default for FastRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl Randomness for FastRandom {
    fn succeeds(&self, _stage: Stage, probability: f64) -> bool {
        self.with_rng(|rng| rng.f64() < probability)
    }

    fn pick(&self, len: usize) -> usize {
        self.with_rng(|rng| rng.usize(..len))
    }

    fn between(&self, low: u64, high: u64) -> u64 {
        self.with_rng(|rng| rng.u64(low..=high))
    }
}

/// Deterministic randomness for tests.
///
/// Outcomes come from a per-stage script first, then from a per-stage
/// fixed outcome, and default to success. `pick` always returns the first
/// choice and `between` the lower bound.
#[derive(Default)]
pub struct ScriptedRandomness {
    fixed: HashMap<Stage, bool>,
    scripts: Mutex<HashMap<Stage, VecDeque<bool>>>,
}

impl ScriptedRandomness {
    /// Every stage succeeds.
    pub fn all_succeed() -> Self {
        Self::default()
    }

    /// `stage` always fails.
    pub fn failing(mut self, stage: Stage) -> Self {
        self.fixed.insert(stage, false);
        self
    }

    /// Queues outcomes for `stage`, consumed before the fixed outcome.
    pub fn script(self, stage: Stage, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(stage)
            .or_default()
            .extend(outcomes);
        self
    }
}

impl Randomness for ScriptedRandomness {
    fn succeeds(&self, stage: Stage, _probability: f64) -> bool {
        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&stage)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| self.fixed.get(&stage).copied().unwrap_or(true))
    }

    fn pick(&self, _len: usize) -> usize {
        0
    }

    fn between(&self, low: u64, _high: u64) -> u64 {
        low
    }
}
