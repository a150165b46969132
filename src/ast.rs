//! Abstract syntax tree for Lira source programs
//!
//! These types are the crate's input interface: the external parser produces
//! them (or deserializes them through serde) and hands them to
//! [`crate::codegen::compile`]. Every node carries the source line it came
//! from, used only for diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete program: procedure declarations followed by one main block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Procedure declarations, in source order
    pub procedures: Vec<ProcedureDecl>,
    /// The main block, entered after all procedure bodies
    pub main: MainBlock,
}

/// A procedure declaration with its parameter list, locals, and body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDecl {
    /// Procedure name
    pub name: String,
    /// Formal parameters, in declaration order
    pub params: Vec<ParamDecl>,
    /// Local variable and array declarations
    pub declarations: Vec<Declaration>,
    /// Body statements
    pub body: Vec<Statement>,
    /// Source line of the procedure head
    pub line: usize,
}

/// One formal parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter mode annotation
    pub mode: ParamMode,
    /// Parameter name
    pub name: String,
    /// Source line of the parameter
    pub line: usize,
}

/// Parameter passing mode
///
/// All parameters are passed by reference: the parameter's memory cell holds
/// the address (or array offset) of the actual argument, never its value.
/// The mode only constrains what the callee and call sites may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    /// No annotation: readable and writable, not initialized at entry
    None,
    /// `I`: initialized at call time, write-protected in the callee
    In,
    /// `O`: not initialized at entry, must be written before any read
    Out,
    /// `T`: an array passed by reference; one slot holding its offset
    ArrayRef,
}

/// The main block: declarations plus the statements control reaches first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainBlock {
    /// Variable and array declarations
    pub declarations: Vec<Declaration>,
    /// Statements of the main block
    pub body: Vec<Statement>,
    /// Source line of the block head
    pub line: usize,
}

/// A local declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Declaration {
    /// A scalar variable
    Scalar {
        /// Variable name
        name: String,
        /// Source line
        line: usize,
    },
    /// An array with inclusive bounds `first:last`
    Array {
        /// Array name
        name: String,
        /// Inclusive lower bound
        first: u64,
        /// Inclusive upper bound
        last: u64,
        /// Source line
        line: usize,
    },
}

/// Statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// Assignment: `target := expr`
    Assign {
        /// Assignment target (scalar or array element)
        target: Target,
        /// Right-hand side expression
        value: Expression,
        /// Source line
        line: usize,
    },

    /// Conditional, with an optional else branch
    If {
        /// Condition to test
        condition: Condition,
        /// Statements executed when the condition holds
        then_branch: Vec<Statement>,
        /// Statements executed otherwise, if present
        else_branch: Option<Vec<Statement>>,
        /// Source line
        line: usize,
    },

    /// Pre-test loop: `while c do S`
    While {
        /// Loop condition, tested before each iteration
        condition: Condition,
        /// Loop body
        body: Vec<Statement>,
        /// Source line
        line: usize,
    },

    /// Post-test loop: `repeat S until c` (continues while `c` is false)
    Repeat {
        /// Loop body, executed at least once
        body: Vec<Statement>,
        /// Exit condition, tested after each iteration
        condition: Condition,
        /// Source line
        line: usize,
    },

    /// Counted loop: `for i from a to/downto b do S`
    ///
    /// Both bounds are evaluated once at entry; the loop is inclusive on
    /// both ends. The iterator is write-protected inside the body and goes
    /// out of scope at loop exit.
    For {
        /// Iterator name
        iterator: String,
        /// Initial value expression
        from: Expression,
        /// Bound expression
        to: Expression,
        /// Counting direction
        direction: ForDirection,
        /// Loop body
        body: Vec<Statement>,
        /// Source line
        line: usize,
    },

    /// Read a value from the outside world into a target
    Read {
        /// Destination (scalar or array element); marked initialized
        target: Target,
        /// Source line
        line: usize,
    },

    /// Write a value to the outside world
    Write {
        /// Expression whose value is written
        value: Expression,
        /// Source line
        line: usize,
    },

    /// Procedure call
    Call {
        /// Callee name
        name: String,
        /// Arguments, one name per formal parameter
        args: Vec<Argument>,
        /// Source line
        line: usize,
    },
}

/// Direction of a `for` loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForDirection {
    /// `to`: iterator counts up, loop runs while `i <= bound`
    Up,
    /// `downto`: iterator counts down, loop runs while `i >= bound`
    Down,
}

/// An assignment or `read` target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name of the scalar or array
    pub name: String,
    /// Subscript expression; `None` for a scalar target
    pub index: Option<Expression>,
    /// Source line
    pub line: usize,
}

/// A call argument (the grammar only permits plain names here)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Name of the variable or array being passed
    pub name: String,
    /// Source line
    pub line: usize,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// Non-negative integer literal
    Number {
        /// Literal value
        value: u64,
        /// Source line
        line: usize,
    },

    /// Scalar variable reference
    Identifier {
        /// Variable name
        name: String,
        /// Source line
        line: usize,
    },

    /// Array element reference `a[index]`
    ArrayElement {
        /// Array name
        name: String,
        /// Subscript expression
        index: Box<Expression>,
        /// Source line
        line: usize,
    },

    /// Binary arithmetic
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand, evaluated first
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
        /// Source line
        line: usize,
    },
}

impl Expression {
    /// Source line of this expression
    pub fn line(&self) -> usize {
        match self {
            Expression::Number { line, .. }
            | Expression::Identifier { line, .. }
            | Expression::ArrayElement { line, .. }
            | Expression::Binary { line, .. } => *line,
        }
    }
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition
    Add,
    /// Saturating subtraction (`max(0, a - b)` on the target machine)
    Sub,
    /// Multiplication (expanded, no primitive instruction)
    Mul,
    /// Integer division (expanded; `a / 0` is 0)
    Div,
    /// Remainder (expanded; `a % 0` is 0)
    Mod,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// A relational condition over two expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Relational operator
    pub op: RelOp,
    /// Left operand (evaluated second during lowering)
    pub left: Expression,
    /// Right operand (evaluated first during lowering)
    pub right: Expression,
    /// Source line
    pub line: usize,
}

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Eq => "=",
            RelOp::NotEq => "!=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::LtEq => "<=",
            RelOp::GtEq => ">=",
        };
        write!(f, "{}", s)
    }
}
