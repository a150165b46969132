//! Instruction emitter with backpatching
//!
//! The emitter owns the append-only instruction buffer. Forward jumps and
//! procedure calls are emitted as placeholders and recorded in a relocation
//! table keyed by instruction index; [`Emitter::finish`] applies the table
//! and refuses to produce a program while any placeholder is unresolved.
//! Backward jumps never need a placeholder: their target index is known
//! before the jump is emitted.

use super::instruction::Instruction;
use super::program::TargetProgram;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Kind of conditional or unconditional jump placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// `JUMP` - unconditional
    Always,
    /// `JZERO` - branch when the accumulator is zero
    IfZero,
    /// `JPOS` - branch when the accumulator is positive
    IfPositive,
}

/// Handle to a pending jump, filled in by [`Emitter::patch`]
///
/// Dropping a handle without patching it leaves the placeholder unresolved
/// and makes `finish` fail, hence `#[must_use]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a pending jump must be patched before the program is finished"]
pub struct JumpHandle(usize);

/// Append-only instruction buffer plus relocation bookkeeping
#[derive(Debug, Default)]
pub struct Emitter {
    instructions: Vec<Instruction>,
    /// instruction index -> resolved jump/call target
    relocations: HashMap<usize, usize>,
    /// indices of placeholders still awaiting a `patch` call
    pending_jumps: Vec<usize>,
    /// call placeholders, keyed by callee name, resolved after all bodies
    pending_calls: Vec<(usize, String)>,
}

impl Emitter {
    /// Create an empty emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next instruction to be emitted
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    /// Append a final instruction
    pub fn emit(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Append a jump whose target is not yet known
    pub fn jump_placeholder(&mut self, kind: JumpKind) -> JumpHandle {
        let index = self.instructions.len();
        let instr = match kind {
            JumpKind::Always => Instruction::Jump(0),
            JumpKind::IfZero => Instruction::Jzero(0),
            JumpKind::IfPositive => Instruction::Jpos(0),
        };
        self.instructions.push(instr);
        self.pending_jumps.push(index);
        JumpHandle(index)
    }

    /// Resolve a pending jump to an absolute instruction index
    pub fn patch(&mut self, handle: JumpHandle, target: usize) {
        self.pending_jumps.retain(|&i| i != handle.0);
        self.relocations.insert(handle.0, target);
    }

    /// Append a `CALL` whose target procedure has not been lowered yet
    pub fn call_placeholder(&mut self, procedure: &str) {
        let index = self.instructions.len();
        self.instructions.push(Instruction::Call(0));
        self.pending_calls.push((index, procedure.to_string()));
    }

    /// Resolve every recorded call against the final procedure addresses
    pub fn resolve_calls(&mut self, lookup: impl Fn(&str) -> Option<usize>) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_calls);
        for (index, name) in pending {
            let target = lookup(&name).ok_or_else(|| {
                Error::internal(format!("call to '{}' was never assigned an address", name))
            })?;
            self.relocations.insert(index, target);
        }
        Ok(())
    }

    /// Apply the relocation table and hand over the finished program
    pub fn finish(mut self) -> Result<TargetProgram> {
        if !self.pending_jumps.is_empty() {
            return Err(Error::internal(format!(
                "{} jump placeholder(s) left unpatched",
                self.pending_jumps.len()
            )));
        }
        if !self.pending_calls.is_empty() {
            return Err(Error::internal(format!(
                "{} call placeholder(s) left unresolved",
                self.pending_calls.len()
            )));
        }
        for (index, target) in self.relocations.drain() {
            let patched = match self.instructions[index] {
                Instruction::Jump(_) => Instruction::Jump(target),
                Instruction::Jzero(_) => Instruction::Jzero(target),
                Instruction::Jpos(_) => Instruction::Jpos(target),
                Instruction::Call(_) => Instruction::Call(target),
                other => {
                    return Err(Error::internal(format!(
                        "relocation at {} points at non-jump instruction {}",
                        index, other
                    )))
                }
            };
            self.instructions[index] = patched;
        }
        Ok(TargetProgram::new(self.instructions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::instruction::Reg;

    #[test]
    fn test_forward_jump_is_patched() {
        let mut emitter = Emitter::new();
        let skip = emitter.jump_placeholder(JumpKind::IfZero);
        emitter.emit(Instruction::Inc(Reg::A));
        emitter.emit(Instruction::Inc(Reg::A));
        let after = emitter.position();
        emitter.patch(skip, after);
        emitter.emit(Instruction::Halt);

        let program = emitter.finish().unwrap();
        assert_eq!(program.instructions()[0], Instruction::Jzero(3));
    }

    #[test]
    fn test_unpatched_jump_is_rejected() {
        let mut emitter = Emitter::new();
        let _pending = emitter.jump_placeholder(JumpKind::Always);
        emitter.emit(Instruction::Halt);
        let err = emitter.finish().unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
    }

    #[test]
    fn test_calls_resolve_by_name() {
        let mut emitter = Emitter::new();
        emitter.call_placeholder("helper");
        emitter.emit(Instruction::Halt);
        emitter.emit(Instruction::Rtrn); // pretend body at index 2
        emitter
            .resolve_calls(|name| if name == "helper" { Some(2) } else { None })
            .unwrap();
        let program = emitter.finish().unwrap();
        assert_eq!(program.instructions()[0], Instruction::Call(2));
    }

    #[test]
    fn test_unknown_call_target_is_internal_error() {
        let mut emitter = Emitter::new();
        emitter.call_placeholder("ghost");
        let err = emitter.resolve_calls(|_| None).unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
    }
}
