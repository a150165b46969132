//! Resolved target program

use super::instruction::Instruction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete, fully resolved target program
///
/// Produced by [`super::emitter::Emitter::finish`]; every jump and call
/// operand is an absolute instruction index by construction. Rendering is
/// one instruction per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProgram {
    instructions: Vec<Instruction>,
}

impl TargetProgram {
    pub(crate) fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// The instruction sequence, in execution order
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program is empty
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Render the program as newline-separated assembly text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for instr in &self.instructions {
            out.push_str(&instr.to_string());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for TargetProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            writeln!(f, "{}", instr)?;
        }
        Ok(())
    }
}
