//! Relational-operator lowering
//!
//! Each of the six operators reduces to a single accumulator value for the
//! branch that follows: zero means false, nonzero means true. The machine
//! has no negative numbers, so every comparison is phrased in saturating
//! differences: `max(0, x - y)` is nonzero exactly when `x > y`, and
//! `1 - max(0, x - y)` is nonzero exactly when `x <= y`. Equality sums both
//! one-sided differences.

use super::generator::CodeGenerator;
use crate::ast::{Condition, RelOp};
use crate::codegen::instruction::{Instruction, Reg};
use crate::error::Result;

impl CodeGenerator {
    /// Evaluate a condition into the accumulator for a zero-test branch
    ///
    /// The right operand is evaluated first, the left second; both land in
    /// the fixed comparison cells. Evaluation order is part of the
    /// observable contract.
    pub(super) fn lower_condition(&mut self, cond: &Condition) -> Result<()> {
        let s = self.symbols.scratch;
        self.lower_expression(&cond.right)?;
        self.emitter.emit(Instruction::Store(s.cmp_right));
        self.lower_expression(&cond.left)?;
        self.emitter.emit(Instruction::Store(s.cmp_left));

        let e = &mut self.emitter;
        match cond.op {
            RelOp::Eq => {
                // 1 - ((right - left) + (left - right))
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Sub(Reg::B));
                e.emit(Instruction::Swp(Reg::C));
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Sub(Reg::B));
                e.emit(Instruction::Add(Reg::C));
                e.emit(Instruction::Swp(Reg::C));
                e.emit(Instruction::Rst(Reg::A));
                e.emit(Instruction::Inc(Reg::A));
                e.emit(Instruction::Sub(Reg::C));
            }
            RelOp::NotEq => {
                // (right - left) + (left - right)
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Sub(Reg::B));
                e.emit(Instruction::Swp(Reg::C));
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Sub(Reg::B));
                e.emit(Instruction::Add(Reg::C));
            }
            RelOp::Lt => {
                // right - left
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Sub(Reg::B));
            }
            RelOp::Gt => {
                // left - right
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Sub(Reg::B));
            }
            RelOp::LtEq => {
                // 1 - (left - right)
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Sub(Reg::B));
                e.emit(Instruction::Swp(Reg::C));
                e.emit(Instruction::Rst(Reg::A));
                e.emit(Instruction::Inc(Reg::A));
                e.emit(Instruction::Sub(Reg::C));
            }
            RelOp::GtEq => {
                // 1 - (right - left)
                e.emit(Instruction::Load(s.cmp_left));
                e.emit(Instruction::Swp(Reg::B));
                e.emit(Instruction::Load(s.cmp_right));
                e.emit(Instruction::Sub(Reg::B));
                e.emit(Instruction::Swp(Reg::C));
                e.emit(Instruction::Rst(Reg::A));
                e.emit(Instruction::Inc(Reg::A));
                e.emit(Instruction::Sub(Reg::C));
            }
        }
        Ok(())
    }
}
