use crate::asset::{Instruction, Microcode, OpKind};
use crate::fsm::FsmState;
use crate::registers::{Reg, RegisterFile};

/// Computes the candidate register file for one cycle.
///
/// The driver is generic over `Executor` so that alternative datapaths (for
/// example a deliberately faulty one) can be checked against the same
/// reference without touching the controller.
pub trait Executor {
    /// Short name used on the command line and in reports.
    const NAME: &'static str;

    /// Apply the instruction addressed by `state.pc()` to `registers` and
    /// return the result. The caller decides whether to commit it.
    fn execute(state: &FsmState, code: &Microcode, registers: &RegisterFile) -> RegisterFile;
}

/// The uLoop datapath: every op of the instruction reads the registers as
/// they were at the start of the cycle.
pub struct Uloop;

impl Executor for Uloop {
    const NAME: &'static str = "uloop";

    fn execute(state: &FsmState, code: &Microcode, registers: &RegisterFile) -> RegisterFile {
        match code.code.get(state.pc()) {
            Some(instr) => apply(instr, registers, |r| r),
            None => *registers,
        }
    }
}

/// A faulty datapath that routes `iter_stride` where `one_stride` belongs and
/// vice versa. Indistinguishable from [`Uloop`] when both strides are equal.
pub struct SwappedStrides;

impl Executor for SwappedStrides {
    const NAME: &'static str = "swapped-strides";

    fn execute(state: &FsmState, code: &Microcode, registers: &RegisterFile) -> RegisterFile {
        match code.code.get(state.pc()) {
            Some(instr) => apply(instr, registers, |r| match r {
                Reg::IterStride => Reg::OneStride,
                Reg::OneStride => Reg::IterStride,
                other => other,
            }),
            None => *registers,
        }
    }
}

/// Apply all ops of `instr` against a snapshot of `registers`, with
/// `route` selecting which register each source operand actually reads.
fn apply(instr: &Instruction, registers: &RegisterFile, route: impl Fn(Reg) -> Reg) -> RegisterFile {
    let mut next = *registers;
    for op in &instr.ops {
        let src = registers.get(route(op.src));
        let value = match op.op {
            OpKind::Add => registers.get(op.dst).wrapping_add(src),
            OpKind::Mv => src,
        };
        next.set_accumulator(op.dst, value);
    }
    next
}
