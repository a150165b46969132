//! Target-machine instruction definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight machine registers
///
/// Register `a` doubles as the accumulator: all arithmetic and every
/// load/store passes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    /// The accumulator
    A,
    /// General register, address operand of `RLOAD`/`RSTORE`
    B,
    /// General register, scratch for condition lowering
    C,
    /// General register
    D,
    /// General register
    E,
    /// General register
    F,
    /// General register
    G,
    /// General register, array-index scratch
    H,
}

impl Reg {
    /// All registers, in reset order
    pub const ALL: [Reg; 8] = [
        Reg::A,
        Reg::B,
        Reg::C,
        Reg::D,
        Reg::E,
        Reg::F,
        Reg::G,
        Reg::H,
    ];
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reg::A => "a",
            Reg::B => "b",
            Reg::C => "c",
            Reg::D => "d",
            Reg::E => "e",
            Reg::F => "f",
            Reg::G => "g",
            Reg::H => "h",
        };
        write!(f, "{}", s)
    }
}

/// A single target-machine instruction
///
/// Registers hold arbitrary-precision non-negative integers; `SUB` and
/// `DEC` saturate at zero. Jump and call operands are absolute instruction
/// indices, memory operands are absolute cell addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Set register to 0
    Rst(Reg),
    /// Increment register by 1
    Inc(Reg),
    /// Decrement register by 1, saturating at 0
    Dec(Reg),
    /// Multiply register by 2
    Shl(Reg),
    /// Divide register by 2 (integer)
    Shr(Reg),
    /// Accumulator += register, saturating
    Add(Reg),
    /// Accumulator -= register, saturating at 0
    Sub(Reg),
    /// Swap accumulator with register
    Swp(Reg),
    /// Accumulator := memory\[addr\]
    Load(u64),
    /// memory\[addr\] := accumulator
    Store(u64),
    /// Accumulator := memory\[register\] (indirect)
    Rload(Reg),
    /// memory\[register\] := accumulator (indirect)
    Rstore(Reg),
    /// Unconditional jump to instruction index
    Jump(usize),
    /// Jump if the accumulator is zero
    Jzero(usize),
    /// Jump if the accumulator is positive
    Jpos(usize),
    /// Call: accumulator := index of next instruction, then jump
    Call(usize),
    /// Return: jump to the instruction index held in the accumulator
    Rtrn,
    /// Read a value from the outside world into the accumulator
    Read,
    /// Write the accumulator to the outside world
    Write,
    /// Stop execution
    Halt,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Rst(r) => write!(f, "RST {}", r),
            Instruction::Inc(r) => write!(f, "INC {}", r),
            Instruction::Dec(r) => write!(f, "DEC {}", r),
            Instruction::Shl(r) => write!(f, "SHL {}", r),
            Instruction::Shr(r) => write!(f, "SHR {}", r),
            Instruction::Add(r) => write!(f, "ADD {}", r),
            Instruction::Sub(r) => write!(f, "SUB {}", r),
            Instruction::Swp(r) => write!(f, "SWP {}", r),
            Instruction::Load(addr) => write!(f, "LOAD {}", addr),
            Instruction::Store(addr) => write!(f, "STORE {}", addr),
            Instruction::Rload(r) => write!(f, "RLOAD {}", r),
            Instruction::Rstore(r) => write!(f, "RSTORE {}", r),
            Instruction::Jump(target) => write!(f, "JUMP {}", target),
            Instruction::Jzero(target) => write!(f, "JZERO {}", target),
            Instruction::Jpos(target) => write!(f, "JPOS {}", target),
            Instruction::Call(target) => write!(f, "CALL {}", target),
            Instruction::Rtrn => write!(f, "RTRN"),
            Instruction::Read => write!(f, "READ"),
            Instruction::Write => write!(f, "WRITE"),
            Instruction::Halt => write!(f, "HALT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rendering() {
        assert_eq!(Reg::A.to_string(), "a");
        assert_eq!(Reg::H.to_string(), "h");
    }

    #[test]
    fn test_instruction_rendering() {
        assert_eq!(Instruction::Rst(Reg::A).to_string(), "RST a");
        assert_eq!(Instruction::Swp(Reg::G).to_string(), "SWP g");
        assert_eq!(Instruction::Load(17).to_string(), "LOAD 17");
        assert_eq!(Instruction::Rstore(Reg::B).to_string(), "RSTORE b");
        assert_eq!(Instruction::Jzero(42).to_string(), "JZERO 42");
        assert_eq!(Instruction::Rtrn.to_string(), "RTRN");
        assert_eq!(Instruction::Halt.to_string(), "HALT");
    }
}
