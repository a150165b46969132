//! Inline expansion of `*`, `/`, and `%`
//!
//! The machine has no multiply or divide, so both are synthesized from
//! shifts, saturating subtraction, and conditional jumps, inline at every
//! occurrence. Each expansion expects the left operand in the accumulator
//! and the right operand in register `b`, and leaves its result in the
//! accumulator. The fixed scratch cells are stored to only after both
//! operands are fully evaluated, so nested expressions cannot clobber a
//! live expansion.

use super::generator::CodeGenerator;
use crate::codegen::emitter::JumpKind;
use crate::codegen::instruction::{Instruction, Reg};

/// Which half of a division expansion to leave in the accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DivResult {
    /// `a / b`
    Quotient,
    /// `a % b`
    Remainder,
}

impl CodeGenerator {
    /// Binary double-and-add multiplication
    ///
    /// `result = 0`; while the multiplier is nonzero: add the addend into
    /// the result when the multiplier's low bit is set (probed by a
    /// `SHR`/`SHL` pair that clears the bit, then subtracting), then double
    /// the addend and halve the multiplier.
    pub(super) fn expand_multiplication(&mut self) {
        let s = self.symbols.scratch;
        let e = &mut self.emitter;

        e.emit(Instruction::Store(s.mul_a));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Store(s.mul_b));
        e.emit(Instruction::Rst(Reg::A));
        e.emit(Instruction::Store(s.mul_res));

        let loop_start = e.position();
        e.emit(Instruction::Load(s.mul_b));
        let done = e.jump_placeholder(JumpKind::IfZero);

        // acc = mul_b with its low bit cleared; the difference is the bit.
        e.emit(Instruction::Shr(Reg::A));
        e.emit(Instruction::Shl(Reg::A));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Load(s.mul_b));
        e.emit(Instruction::Sub(Reg::B));
        let skip_add = e.jump_placeholder(JumpKind::IfZero);

        e.emit(Instruction::Load(s.mul_res));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Load(s.mul_a));
        e.emit(Instruction::Add(Reg::B));
        e.emit(Instruction::Store(s.mul_res));

        let after_add = e.position();
        e.patch(skip_add, after_add);
        e.emit(Instruction::Load(s.mul_a));
        e.emit(Instruction::Shl(Reg::A));
        e.emit(Instruction::Store(s.mul_a));
        e.emit(Instruction::Load(s.mul_b));
        e.emit(Instruction::Shr(Reg::A));
        e.emit(Instruction::Store(s.mul_b));
        e.emit(Instruction::Jump(loop_start));

        let after_loop = e.position();
        e.patch(done, after_loop);
        e.emit(Instruction::Load(s.mul_res));
    }

    /// Shift-normalize division with restoring subtraction
    ///
    /// A zero divisor short-circuits to 0 for both quotient and remainder;
    /// the machine has no trap. Otherwise the divisor copy is doubled (with
    /// a parallel weight starting at 1) to the largest multiple not
    /// exceeding the dividend, then walked back down, subtracting where it
    /// fits and accumulating the weight into the quotient. Saturation is
    /// what makes the compare-by-subtraction tests sound.
    pub(super) fn expand_division(&mut self, result: DivResult) {
        let s = self.symbols.scratch;
        let e = &mut self.emitter;

        e.emit(Instruction::Store(s.div_rem));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Store(s.div_div));

        e.emit(Instruction::Load(s.div_div));
        let divisor_zero = e.jump_placeholder(JumpKind::IfZero);

        e.emit(Instruction::Rst(Reg::A));
        e.emit(Instruction::Store(s.div_quot));
        e.emit(Instruction::Inc(Reg::A));
        e.emit(Instruction::Store(s.div_weight));

        // Normalize: double divisor and weight while divisor*2 <= dividend.
        let shift_start = e.position();
        e.emit(Instruction::Load(s.div_rem));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Load(s.div_div));
        e.emit(Instruction::Shl(Reg::A));
        e.emit(Instruction::Sub(Reg::B));
        let shift_done = e.jump_placeholder(JumpKind::IfPositive);

        e.emit(Instruction::Load(s.div_div));
        e.emit(Instruction::Shl(Reg::A));
        e.emit(Instruction::Store(s.div_div));
        e.emit(Instruction::Load(s.div_weight));
        e.emit(Instruction::Shl(Reg::A));
        e.emit(Instruction::Store(s.div_weight));
        e.emit(Instruction::Jump(shift_start));

        let main_start = e.position();
        e.patch(shift_done, main_start);

        // Walk back down; the weight reaching zero ends the division.
        e.emit(Instruction::Load(s.div_weight));
        let main_done = e.jump_placeholder(JumpKind::IfZero);

        e.emit(Instruction::Load(s.div_rem));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Load(s.div_div));
        e.emit(Instruction::Sub(Reg::B));
        let skip_subtract = e.jump_placeholder(JumpKind::IfPositive);

        e.emit(Instruction::Load(s.div_rem));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Load(s.div_div));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Sub(Reg::B));
        e.emit(Instruction::Store(s.div_rem));

        e.emit(Instruction::Load(s.div_quot));
        e.emit(Instruction::Swp(Reg::B));
        e.emit(Instruction::Load(s.div_weight));
        e.emit(Instruction::Add(Reg::B));
        e.emit(Instruction::Store(s.div_quot));

        let after_subtract = e.position();
        e.patch(skip_subtract, after_subtract);
        e.emit(Instruction::Load(s.div_div));
        e.emit(Instruction::Shr(Reg::A));
        e.emit(Instruction::Store(s.div_div));
        e.emit(Instruction::Load(s.div_weight));
        e.emit(Instruction::Shr(Reg::A));
        e.emit(Instruction::Store(s.div_weight));
        e.emit(Instruction::Jump(main_start));

        let after_main = e.position();
        e.patch(main_done, after_main);
        match result {
            DivResult::Quotient => e.emit(Instruction::Load(s.div_quot)),
            DivResult::Remainder => e.emit(Instruction::Load(s.div_rem)),
        }
        let skip_zero_case = e.jump_placeholder(JumpKind::Always);

        let zero_case = e.position();
        e.patch(divisor_zero, zero_case);
        e.emit(Instruction::Rst(Reg::A));

        let after_all = e.position();
        e.patch(skip_zero_case, after_all);
    }
}
