use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::asset::Microcode;
use crate::driver::{self, DEFAULT_CYCLE_BUDGET, RunConfig, RunOutcome};
use crate::error::AssetLoadError;
use crate::executor::Executor;

/// The configuration matrix to sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Outer axis of the matrix.
    pub nb_iters: Vec<u32>,
    /// Inner axis of the matrix.
    pub iter_strides: Vec<i64>,
    pub one_stride: i64,
    pub cycle_budget: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            nb_iters: vec![16, 32, 64],
            iter_strides: vec![1, 16, 32],
            one_stride: 1,
            cycle_budget: DEFAULT_CYCLE_BUDGET,
        }
    }
}

impl SweepConfig {
    /// Every configuration in sweep order: `nb_iter` outer, `iter_stride` inner.
    pub fn configs(&self) -> Vec<RunConfig> {
        self.nb_iters
            .iter()
            .flat_map(|&nb_iter| {
                self.iter_strides.iter().map(move |&iter_stride| {
                    RunConfig::new(nb_iter, iter_stride, self.one_stride)
                        .cycle_budget(self.cycle_budget)
                })
            })
            .collect()
    }
}

/// Outcome of a sweep, in sweep order.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Outcomes up to and including the first configuration with value
    /// mismatches (all of them if none failed).
    pub outcomes: Vec<RunOutcome>,
    /// Index into `outcomes` of the first configuration with value mismatches.
    pub first_failure: Option<usize>,
}

impl SweepReport {
    fn from_ordered(all: Vec<RunOutcome>) -> Self {
        let first_failure = all.iter().position(|o| o.errors > 0);
        let mut outcomes = all;
        if let Some(i) = first_failure {
            outcomes.truncate(i + 1);
        }
        Self {
            outcomes,
            first_failure,
        }
    }

    pub fn first_failing(&self) -> Option<&RunOutcome> {
        self.first_failure.map(|i| &self.outcomes[i])
    }

    /// Runs that never signalled `end`. Reported separately from value
    /// mismatches; they do not stop the sweep.
    pub fn budget_exceeded(&self) -> impl Iterator<Item = &RunOutcome> {
        self.outcomes.iter().filter(|o| o.budget_exceeded)
    }

    pub fn total_errors(&self) -> usize {
        self.outcomes.iter().map(|o| o.errors).sum()
    }

    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(RunOutcome::passed)
    }
}

/// Run every configuration, in parallel, and inspect the results in order.
///
/// Runs are independent, so all of them are simulated; the report is cut at
/// the first configuration with value mismatches, as a sequential sweep that
/// stops there would see it.
pub fn sweep<E: Executor>(microcode: &Microcode, config: &SweepConfig) -> Result<SweepReport, AssetLoadError> {
    run_ordered::<E>(microcode, config.configs())
}

/// Check `count` configurations drawn reproducibly from `seed`.
pub fn random_sweep<E: Executor>(
    microcode: &Microcode,
    seed: u64,
    count: usize,
    cycle_budget: usize,
) -> Result<SweepReport, AssetLoadError> {
    run_ordered::<E>(microcode, random_configs(seed, count, cycle_budget))
}

/// Random configurations whose loops fit comfortably in `cycle_budget`.
pub fn random_configs(seed: u64, count: usize, cycle_budget: usize) -> Vec<RunConfig> {
    let mut rng = SmallRng::seed_from_u64(seed);
    // A run of nb_iter takes nb_iter + 1 cycles.
    let max_iter = cycle_budget.saturating_sub(1).clamp(1, u32::MAX as usize) as u32;
    (0..count)
        .map(|_| {
            let nb_iter = rng.gen_range(1..=max_iter);
            let iter_stride = rng.gen_range(-256..=256);
            let one_stride = rng.gen_range(-16..=16);
            RunConfig::new(nb_iter, iter_stride, one_stride).cycle_budget(cycle_budget)
        })
        .collect()
}

fn run_ordered<E: Executor>(
    microcode: &Microcode,
    configs: Vec<RunConfig>,
) -> Result<SweepReport, AssetLoadError> {
    let outcomes = configs
        .into_par_iter()
        .map(|config| driver::check::<E>(microcode, config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SweepReport::from_ordered(outcomes))
}
