use std::fmt;

use serde::Deserialize;

/// Number of slots in the register file.
pub const NUM_REGISTERS: usize = 7;

/// Number of mutable index accumulators (`a_idx` .. `d_idx`).
pub const NUM_ACCUMULATORS: usize = 4;

/// A named register slot.
///
/// Slots 0-3 are the index accumulators the microcode updates. Slots 4-6 are
/// configuration scalars, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reg {
    AIdx,
    BIdx,
    CIdx,
    DIdx,
    NbIter,
    IterStride,
    OneStride,
}

impl Reg {
    pub const ALL: [Reg; NUM_REGISTERS] = [
        Reg::AIdx,
        Reg::BIdx,
        Reg::CIdx,
        Reg::DIdx,
        Reg::NbIter,
        Reg::IterStride,
        Reg::OneStride,
    ];

    /// Position of this register in the register file.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_accumulator(self) -> bool {
        self.index() < NUM_ACCUMULATORS
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::AIdx => "a_idx",
            Reg::BIdx => "b_idx",
            Reg::CIdx => "c_idx",
            Reg::DIdx => "d_idx",
            Reg::NbIter => "nb_iter",
            Reg::IterStride => "iter_stride",
            Reg::OneStride => "one_stride",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The uLoop register file: `[a_idx, b_idx, c_idx, d_idx, nb_iter, iter_stride, one_stride]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile([i64; NUM_REGISTERS]);

impl RegisterFile {
    /// Zeroed accumulators with the given configuration scalars.
    pub fn new(nb_iter: i64, iter_stride: i64, one_stride: i64) -> Self {
        Self([0, 0, 0, 0, nb_iter, iter_stride, one_stride])
    }

    pub fn get(&self, reg: Reg) -> i64 {
        self.0[reg.index()]
    }

    /// Write an accumulator. Configuration scalars are read-only; the asset
    /// loader rejects any instruction that targets one, so this is only ever
    /// reached with an accumulator.
    pub(crate) fn set_accumulator(&mut self, reg: Reg, value: i64) {
        debug_assert!(reg.is_accumulator(), "{reg} is read-only");
        if reg.is_accumulator() {
            self.0[reg.index()] = value;
        }
    }

    /// The four index accumulators `(a, b, c, d)`.
    pub fn accumulators(&self) -> [i64; NUM_ACCUMULATORS] {
        [self.0[0], self.0[1], self.0[2], self.0[3]]
    }

    /// The three configuration scalars `(nb_iter, iter_stride, one_stride)`.
    pub fn config(&self) -> [i64; 3] {
        [self.0[4], self.0[5], self.0[6]]
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.accumulators();
        write!(f, "a={a} b={b} c={c} d={d}")
    }
}
