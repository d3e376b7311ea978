use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::pid_system_model::workflow::task_store::TaskKey;

/// Picks the next admission candidate among the queued tasks.
///
/// The scheduler only requires the choice to be fair among eligible candidates, not
/// reproducible.
pub trait TaskSelector: std::fmt::Debug {
    /// Returns the index into `candidates` of the task to try next, or `None` for an
    /// empty slice.
    fn select(&mut self, candidates: &[TaskKey]) -> Option<usize>;
}

/// Uniformly random choice among the candidates.
#[derive(Debug)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    pub fn new() -> Self {
        RandomSelector { rng: StdRng::from_os_rng() }
    }

    /// Same seed, same admission order.
    pub fn seeded(seed: u64) -> Self {
        RandomSelector { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSelector for RandomSelector {
    fn select(&mut self, candidates: &[TaskKey]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(self.rng.random_range(0..candidates.len()))
    }
}

/// Always the oldest queued candidate first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoSelector;

impl TaskSelector for FifoSelector {
    fn select(&mut self, candidates: &[TaskKey]) -> Option<usize> {
        if candidates.is_empty() { None } else { Some(0) }
    }
}
