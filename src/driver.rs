use std::fmt;
use std::marker::PhantomData;

use log::{debug, info, warn};

use crate::asset::Microcode;
use crate::error::AssetLoadError;
use crate::executor::Executor;
use crate::fsm::{self, FsmState, Phase, Step};
use crate::geometry::LoopGeometry;
use crate::reference::{Expected, Reference};
use crate::registers::RegisterFile;

/// Cycles a run may take before it is declared hung.
pub const DEFAULT_CYCLE_BUDGET: usize = 1000;

/// Configuration of a single differential run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Trip count of the (single) loop.
    pub nb_iter: u32,
    /// Stride applied to `a` and `b` each iteration.
    pub iter_stride: i64,
    /// Stride applied to `c` and `d` each iteration.
    pub one_stride: i64,
    /// Maximum number of cycles to simulate.
    pub cycle_budget: usize,
    /// Emit per-cycle diagnostics.
    pub verbose: bool,
}

impl RunConfig {
    pub fn new(nb_iter: u32, iter_stride: i64, one_stride: i64) -> Self {
        Self {
            nb_iter,
            iter_stride,
            one_stride,
            cycle_budget: DEFAULT_CYCLE_BUDGET,
            verbose: false,
        }
    }

    pub fn verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    pub fn cycle_budget(self, cycle_budget: usize) -> Self {
        Self {
            cycle_budget,
            ..self
        }
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nb_iter={}, iter_stride={}, one_stride={}",
            self.nb_iter, self.iter_stride, self.one_stride
        )
    }
}

/// A settle point where the committed registers disagreed with the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub cycle: usize,
    pub expected: Expected,
    pub observed: [i64; 4],
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.observed;
        write!(
            f,
            "cycle {}: high-level {} / uLoop a={a} b={b} c={c} d={d}",
            self.cycle, self.expected
        )
    }
}

/// Everything observable about one simulated cycle.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub index: usize,
    pub step: Step,
    /// Controller state after the cycle.
    pub state: FsmState,
    /// Register file after the commit-or-discard decision.
    pub registers: RegisterFile,
    /// The reference value compared against, if this was a settle point.
    pub expected: Option<Expected>,
    pub mismatch: bool,
}

/// Result of one differential run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub config: RunConfig,
    /// Settle points whose registers diverged from the reference.
    pub errors: usize,
    pub cycles: usize,
    pub settles: usize,
    /// The controller never signalled `end` within the cycle budget.
    pub budget_exceeded: bool,
    pub first_mismatch: Option<Mismatch>,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.errors == 0 && !self.budget_exceeded
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors", self.errors)?;
        if self.errors > 0 {
            write!(f, " !!!")?;
        }
        if self.budget_exceeded {
            write!(
                f,
                " (no end after {} cycles: cycle budget exceeded)",
                self.cycles
            )?;
        }
        Ok(())
    }
}

/// A uLoop controller and executor running in lockstep with the reference.
///
/// Each call to [`Simulation::step`] is one cycle: the executor computes a
/// candidate register file, the controller decides whether to commit it, and
/// at settle points the committed values are compared with the next
/// reference value.
pub struct Simulation<'a, E: Executor> {
    microcode: &'a Microcode,
    geometry: LoopGeometry,
    config: RunConfig,
    registers: RegisterFile,
    state: FsmState,
    reference: Reference,
    expected: Expected,
    cycle: usize,
    settles: usize,
    errors: usize,
    first_mismatch: Option<Mismatch>,
    ended: bool,
    _executor: PhantomData<E>,
}

impl<'a, E: Executor> Simulation<'a, E> {
    pub fn new(microcode: &'a Microcode, config: RunConfig) -> Result<Self, AssetLoadError> {
        let loops_range = [config.nb_iter];
        let geometry = LoopGeometry::new(&microcode.loops, &loops_range)?;
        let state = FsmState::new(geometry.depth());
        Ok(Self {
            microcode,
            geometry,
            config,
            registers: RegisterFile::new(
                i64::from(config.nb_iter),
                config.iter_stride,
                config.one_stride,
            ),
            state,
            reference: Reference::new(config.nb_iter, config.iter_stride, config.one_stride),
            expected: Expected::origin(),
            cycle: 0,
            settles: 0,
            errors: 0,
            first_mismatch: None,
            ended: false,
            _executor: PhantomData,
        })
    }

    /// Simulate one cycle. Returns `None` once the controller has ended or
    /// the cycle budget is spent.
    pub fn step(&mut self) -> Option<Cycle> {
        if self.ended || self.cycle >= self.config.cycle_budget {
            return None;
        }
        let index = self.cycle;
        self.cycle += 1;

        let candidate = E::execute(&self.state, self.microcode, &self.registers);
        let (step, state) = fsm::step(&self.geometry, self.state.clone());
        self.state = state;
        if step.execute {
            self.registers = candidate;
        }

        let mut expected = None;
        let mut mismatch = false;
        if !step.busy {
            self.settles += 1;
            if let Some(next) = self.reference.next() {
                self.expected = next;
            }
            expected = Some(self.expected);
            if self.config.verbose {
                info!("[{index:4}] {} | {}", self.state, self.registers);
            }
            let observed = self.registers.accumulators();
            if observed != self.expected.accumulators() {
                mismatch = true;
                self.errors += 1;
                let m = Mismatch {
                    cycle: index,
                    expected: self.expected,
                    observed,
                };
                if self.config.verbose {
                    warn!("ERROR!!! {m}");
                }
                self.first_mismatch.get_or_insert(m);
            }
        } else if self.config.verbose {
            debug!("[{index:4}] {} | busy", self.state);
        }

        if step.end {
            self.ended = true;
        }

        Some(Cycle {
            index,
            step,
            state: self.state.clone(),
            registers: self.registers,
            expected,
            mismatch,
        })
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn state(&self) -> &FsmState {
        &self.state
    }

    pub fn geometry(&self) -> &LoopGeometry {
        &self.geometry
    }

    /// Summarize the run so far.
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            config: self.config,
            errors: self.errors,
            cycles: self.cycle,
            settles: self.settles,
            budget_exceeded: !self.ended,
            first_mismatch: self.first_mismatch,
        }
    }
}

/// Run one configuration to completion (or budget exhaustion).
pub fn check<E: Executor>(microcode: &Microcode, config: RunConfig) -> Result<RunOutcome, AssetLoadError> {
    let mut sim = Simulation::<E>::new(microcode, config)?;
    if config.verbose {
        info!("> Config {config} ({} executor)", E::NAME);
    }
    while let Some(cycle) = sim.step() {
        if cycle.step.phase == Phase::Done {
            debug!("loop nest done after {} cycles", cycle.index + 1);
        }
    }
    let outcome = sim.outcome();
    if outcome.budget_exceeded {
        warn!("{config}: no end within {} cycles", config.cycle_budget);
    }
    Ok(outcome)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::executor::Uloop;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn uloop_matches_reference(
            nb_iter in 1u32..400,
            iter_stride in -128i64..128,
            one_stride in -16i64..16
        ) {
            let mc = Microcode::builtin().unwrap();
            let out = check::<Uloop>(&mc, RunConfig::new(nb_iter, iter_stride, one_stride)).unwrap();
            prop_assert_eq!(out.errors, 0);
            prop_assert!(!out.budget_exceeded);
            prop_assert_eq!(out.settles, nb_iter as usize);
            prop_assert_eq!(out.cycles, nb_iter as usize + 1);
        }
    }
}
