use std::fmt;

use crate::geometry::LoopGeometry;

/// Hardware-internal state of the loop controller.
///
/// - `pc`: address of the instruction the executor applies this cycle
/// - `level`: loop-stack pointer, the level currently being iterated
/// - `primed`: cleared at reset; the first cycle is a startup bubble
/// - `idx`: per-level iteration index, innermost level first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsmState {
    pc: usize,
    level: usize,
    primed: bool,
    idx: Vec<u32>,
}

impl FsmState {
    /// Reset state for a nest of the given depth.
    pub fn new(depth: usize) -> Self {
        Self {
            pc: 0,
            level: 0,
            primed: false,
            idx: vec![0; depth],
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn idx(&self) -> &[u32] {
        &self.idx
    }

    /// Flat iteration number across the nest, innermost level fastest.
    /// Saturates at `u64::MAX` like [`LoopGeometry::total_iterations`].
    pub fn flat_index(&self, geometry: &LoopGeometry) -> u64 {
        self.idx
            .iter()
            .zip(geometry.levels())
            .rev()
            .fold(0u64, |acc, (&i, l)| {
                acc.saturating_mul(u64::from(l.range))
                    .saturating_add(u64::from(i))
            })
    }
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pc={} level={} primed={} idx={:?}",
            self.pc, self.level, self.primed as u8, self.idx
        )
    }
}

/// What the controller did in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A level advanced; the instruction's result is committed.
    Advancing,
    /// Pipeline bubble: startup, or popping to an outer level.
    Stalled,
    /// Every level is exhausted.
    Done,
}

/// Control outputs of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Commit the executor's candidate registers.
    pub execute: bool,
    /// Registers are not a settled index this cycle and must not be sampled.
    pub busy: bool,
    /// The loop nest has terminated.
    pub end: bool,
    pub phase: Phase,
}

impl Step {
    fn advancing() -> Self {
        Self {
            execute: true,
            busy: false,
            end: false,
            phase: Phase::Advancing,
        }
    }

    fn stalled() -> Self {
        Self {
            execute: false,
            busy: true,
            end: false,
            phase: Phase::Stalled,
        }
    }

    fn done() -> Self {
        Self {
            execute: false,
            busy: false,
            end: true,
            phase: Phase::Done,
        }
    }
}

/// Advance the controller by one cycle.
///
/// The candidate computed by the executor for this cycle comes from the
/// instruction at `state.pc()`, which always addresses the current level's
/// instruction once the controller is primed. Stepping a finished controller
/// returns `Done` again and leaves the state unchanged.
pub fn step(geometry: &LoopGeometry, mut state: FsmState) -> (Step, FsmState) {
    debug_assert_eq!(state.idx.len(), geometry.depth());

    if !state.primed {
        state.primed = true;
        state.level = 0;
        state.pc = geometry.level(0).addr;
        return (Step::stalled(), state);
    }

    let level = state.level;
    if state.idx[level] + 1 < geometry.level(level).range {
        state.idx[level] += 1;
        state.level = 0;
        state.pc = geometry.level(0).addr;
        return (Step::advancing(), state);
    }

    if level + 1 < geometry.depth() {
        state.idx[level] = 0;
        state.level = level + 1;
        state.pc = geometry.level(level + 1).addr;
        return (Step::stalled(), state);
    }

    (Step::done(), state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::LoopOp;

    fn geometry(ranges: &[u32]) -> LoopGeometry {
        let ops: Vec<LoopOp> = (0..ranges.len())
            .map(|i| LoopOp {
                name: format!("l{i}"),
                addr: i,
            })
            .collect();
        LoopGeometry::new(&ops, ranges).unwrap()
    }

    /// Step until `end`, returning every step taken.
    fn run(geom: &LoopGeometry) -> Vec<(Step, FsmState)> {
        let mut state = FsmState::new(geom.depth());
        let mut trace = Vec::new();
        for _ in 0..10_000 {
            let (s, next) = step(geom, state);
            state = next;
            trace.push((s, state.clone()));
            if s.end {
                break;
            }
        }
        trace
    }

    #[test]
    fn test_initial_state() {
        let state = FsmState::new(3);
        assert_eq!(state.pc(), 0);
        assert_eq!(state.level(), 0);
        assert_eq!(state.idx(), &[0, 0, 0]);
    }

    #[test]
    fn test_first_cycle_is_startup_bubble() {
        let geom = geometry(&[4]);
        let (s, state) = step(&geom, FsmState::new(1));
        assert_eq!(s.phase, Phase::Stalled);
        assert!(s.busy && !s.execute && !s.end);
        assert_eq!(state.idx(), &[0]);
    }

    #[test]
    fn test_single_level_trajectory() {
        let geom = geometry(&[16]);
        let trace = run(&geom);
        // startup + 15 advances + done
        assert_eq!(trace.len(), 17);
        let advances: Vec<u32> = trace
            .iter()
            .filter(|(s, _)| s.phase == Phase::Advancing)
            .map(|(_, st)| st.idx()[0])
            .collect();
        assert_eq!(advances, (1..16).collect::<Vec<_>>());
        let (last, _) = trace.last().unwrap();
        assert!(last.end && !last.busy && !last.execute);
    }

    #[test]
    fn test_single_iteration_ends_after_startup() {
        let geom = geometry(&[1]);
        let trace = run(&geom);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].0.phase, Phase::Stalled);
        assert_eq!(trace[1].0.phase, Phase::Done);
    }

    #[test]
    fn test_end_only_on_final_cycle() {
        let geom = geometry(&[3, 2]);
        let trace = run(&geom);
        let ends = trace.iter().filter(|(s, _)| s.end).count();
        assert_eq!(ends, 1);
        assert!(trace.last().unwrap().0.end);
    }

    #[test]
    fn test_done_is_sticky() {
        let geom = geometry(&[2]);
        let (_, done_state) = run(&geom).pop().unwrap();
        let (s, again) = step(&geom, done_state.clone());
        assert_eq!(s.phase, Phase::Done);
        assert_eq!(again, done_state);
    }

    #[test]
    fn test_nested_visits_every_index_once() {
        let geom = geometry(&[3, 4]);
        let trace = run(&geom);
        let settled: Vec<u64> = trace
            .iter()
            .filter(|(s, _)| !s.busy && !s.end)
            .map(|(_, st)| st.flat_index(&geom))
            .collect();
        assert_eq!(settled, (1..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_nested_pop_stalls_and_targets_outer_instruction() {
        let geom = geometry(&[2, 3]);
        let mut state = FsmState::new(2);
        let mut steps = Vec::new();
        loop {
            let (s, next) = step(&geom, state);
            state = next;
            steps.push((s.phase, state.pc(), state.level()));
            if s.end {
                break;
            }
        }
        assert_eq!(
            steps,
            vec![
                (Phase::Stalled, 0, 0),   // startup
                (Phase::Advancing, 0, 0), // idx = [1, 0]
                (Phase::Stalled, 1, 1),   // pop to outer
                (Phase::Advancing, 0, 0), // idx = [0, 1]
                (Phase::Advancing, 0, 0), // idx = [1, 1]
                (Phase::Stalled, 1, 1),
                (Phase::Advancing, 0, 0), // idx = [0, 2]
                (Phase::Advancing, 0, 0), // idx = [1, 2]
                (Phase::Stalled, 1, 1),
                (Phase::Done, 1, 1),
            ]
        );
    }

    #[test]
    fn test_flat_index_saturates_on_huge_nest() {
        let geom = geometry(&[u32::MAX; 6]);
        let mut state = FsmState::new(6);
        state.idx = vec![u32::MAX - 1; 6];
        assert_eq!(state.flat_index(&geom), u64::MAX);
    }

    #[test]
    fn test_idx_len_matches_depth() {
        let geom = geometry(&[2, 2, 2, 2, 2, 2]);
        for (_, st) in run(&geom) {
            assert_eq!(st.idx().len(), 6);
        }
    }
}
