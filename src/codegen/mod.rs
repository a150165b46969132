//! # Code generation - AST to register-machine assembly
//!
//! This module lowers a [`crate::ast::Program`] to linear assembly for the
//! abstract register machine in a single pass, with no intermediate
//! representation beyond the instruction stream itself.
//!
//! ## Module Structure
//!
//! ```text
//! codegen/
//! ├── mod.rs          # This file - module definition and compile() entry
//! ├── instruction.rs  # Reg, Instruction enums and text rendering
//! ├── program.rs      # TargetProgram (fully resolved sequence)
//! ├── emitter.rs      # instruction buffer, jump handles, relocations
//! ├── symbols.rs      # scopes, symbols, procedures, address allocator
//! ├── generator.rs    # CodeGenerator - the statement/expression walker
//! ├── arith.rs        # *, /, % expansion over scratch cells
//! └── cond.rs         # relational operators as saturating differences
//! ```
//!
//! ## Key Types
//!
//! - [`Instruction`] / [`Reg`] - the closed target instruction set
//! - [`Emitter`] / [`JumpHandle`] - append-only buffer with backpatching
//! - [`SymbolTable`] - flat address space, two-tier name resolution
//! - [`CodeGenerator`] - the compilation context, consumed by `compile`
//! - [`TargetProgram`] - the resolved output, rendered one line per
//!   instruction
//!
//! Compilation is synchronous and fail-fast: the first semantic error
//! aborts with no partial output.

mod arith;
mod cond;
mod emitter;
mod generator;
mod instruction;
mod program;
mod symbols;

pub use emitter::{Emitter, JumpHandle, JumpKind};
pub use generator::CodeGenerator;
pub use instruction::{Instruction, Reg};
pub use program::TargetProgram;
pub use symbols::{ProcedureInfo, Scope, ScratchCells, Symbol, SymbolKind, SymbolTable};

use crate::ast::Program;
use crate::error::Result;

/// Compile a program AST into a fully resolved target program
///
/// Convenience wrapper around [`CodeGenerator::compile`].
pub fn compile(program: &Program) -> Result<TargetProgram> {
    CodeGenerator::new().compile(program)
}
