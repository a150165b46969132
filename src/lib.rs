//! # Lira - a compiler for a small imperative language
//!
//! Lira compiles programs in a small imperative language (procedures with
//! call-by-reference parameters, arrays, `for`/`while`/`repeat` loops,
//! integer arithmetic) into linear assembly for an abstract register
//! machine. The machine has no native multiplication, division, or
//! immediate-load instruction, its registers hold only non-negative
//! integers, and subtraction saturates at zero - so the interesting work
//! happens in the lowering pass: flat address allocation across scopes,
//! definite-assignment and parameter-mode checking, inline expansion of
//! `*`, `/`, `%` and the six relational operators from shifts and
//! saturating subtraction, and backpatched jump/call targets, all in a
//! single pass.
//!
//! The crate is a library. Its input is an abstract syntax tree
//! ([`ast::Program`], typically produced by an external parser or
//! deserialized via serde); its output is a [`codegen::TargetProgram`]
//! rendering to newline-separated assembly text. Scanning, parsing, the
//! command line, and execution of the emitted code are external concerns.
//!
//! ## Quick Start
//!
//! Compile `x := 3 + 4; write x;`:
//!
//! ```rust
//! use lira::ast::{
//!     BinaryOp, Expression, MainBlock, Declaration, Program, Statement, Target,
//! };
//! use lira::codegen;
//!
//! # fn main() -> lira::Result<()> {
//! let program = Program {
//!     procedures: vec![],
//!     main: MainBlock {
//!         declarations: vec![Declaration::Scalar { name: "x".into(), line: 1 }],
//!         body: vec![
//!             Statement::Assign {
//!                 target: Target { name: "x".into(), index: None, line: 2 },
//!                 value: Expression::Binary {
//!                     op: BinaryOp::Add,
//!                     left: Box::new(Expression::Number { value: 3, line: 2 }),
//!                     right: Box::new(Expression::Number { value: 4, line: 2 }),
//!                     line: 2,
//!                 },
//!                 line: 2,
//!             },
//!             Statement::Write {
//!                 value: Expression::Identifier { name: "x".into(), line: 3 },
//!                 line: 3,
//!             },
//!         ],
//!         line: 1,
//!     },
//! };
//!
//! let compiled = codegen::compile(&program)?;
//! // Fully resolved assembly, one instruction per line.
//! assert!(compiled.to_text().ends_with("HALT\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Compilation is fail-fast: the first semantic error (redeclaration,
//! undeclared name, use before assignment, parameter-mode violation,
//! arity/type mismatch, literal index out of range, unknown procedure,
//! recursive call) aborts with an [`Error`] carrying the offending source
//! line. No partial program is ever produced.
//!
//! ## Target machine notes
//!
//! - Division or modulo by zero compiles to code that yields 0 - the
//!   machine has no trap mechanism.
//! - Procedure calls are not reentrant: each procedure owns a single
//!   return-address slot. Direct recursion is rejected at compile time.

/// Version of the Lira compiler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod codegen;
pub mod error;

// Re-export main types
pub use ast::Program;
pub use codegen::{CodeGenerator, Instruction, Reg, TargetProgram};
pub use error::{Error, Result};
