//! Error types for the Lira compiler

use thiserror::Error;

/// Compilation errors
///
/// Every variant carries the source line of the offending construct.
/// Propagation is fail-fast: the first error aborts the whole compilation
/// and no partial program is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Name already declared in the current scope
    ///
    /// **Triggered by:** declaring a variable, array, or iterator whose name
    /// already exists in the scope being extended.
    #[error("line {line}: redeclaration of '{name}'")]
    Redeclaration {
        /// The name that was declared twice
        name: String,
        /// Source line of the second declaration
        line: usize,
    },

    /// Use of a name that is not declared in the current scope or globally
    #[error("line {line}: use of undeclared name '{name}'")]
    UndeclaredName {
        /// The unknown name
        name: String,
        /// Source line of the use
        line: usize,
    },

    /// Read of a variable or parameter before any write to it
    ///
    /// **Triggered by:** reading a scalar before assignment, writing out an
    /// unset `Out` parameter, or passing an uninitialized argument to an
    /// `In` parameter.
    #[error("line {line}: '{name}' is used before it is assigned a value")]
    UninitializedUse {
        /// The uninitialized name
        name: String,
        /// Source line of the read
        line: usize,
    },

    /// Illegal use of a parameter or iterator for its mode
    ///
    /// **Triggered by:** writing to an `In` parameter, writing to a loop
    /// iterator, an illegal mode-to-mode argument binding at a call site,
    /// or an unknown parameter-mode token in a procedure head.
    #[error("line {line}: {message}")]
    ParameterMode {
        /// Description of the violated mode rule
        message: String,
        /// Source line of the violation
        line: usize,
    },

    /// Wrong argument count or array/scalar mismatch
    ///
    /// **Triggered by:** calling a procedure with the wrong number of
    /// arguments, passing a scalar where an array parameter is expected (or
    /// vice versa), subscripting a scalar, or using an array name as a
    /// scalar value.
    #[error("line {line}: {message}")]
    ArityOrType {
        /// Description of the mismatch
        message: String,
        /// Source line of the mismatch
        line: usize,
    },

    /// Literal array index outside the declared bounds
    ///
    /// Indices only known at runtime are not range-checked: the target
    /// machine has no trap mechanism for them.
    #[error("line {line}: index {index} outside bounds {first}:{last} of array '{name}'")]
    IndexRange {
        /// The array name
        name: String,
        /// The out-of-range literal index
        index: u64,
        /// Declared lower bound
        first: u64,
        /// Declared upper bound
        last: u64,
        /// Source line of the access
        line: usize,
    },

    /// Call to a procedure that was never declared
    #[error("line {line}: unknown procedure '{name}'")]
    UnknownProcedure {
        /// The unknown procedure name
        name: String,
        /// Source line of the call
        line: usize,
    },

    /// A procedure calls itself
    ///
    /// The target machine provides exactly one return-address slot per
    /// procedure, so a nested call would overwrite the outer call's return
    /// address. Direct recursion is rejected instead of miscompiled.
    #[error("line {line}: procedure '{name}' calls itself; recursive calls are not supported")]
    RecursiveCall {
        /// The self-calling procedure
        name: String,
        /// Source line of the call
        line: usize,
    },

    /// Internal invariant violation in the code generator
    ///
    /// Never caused by user input; reported instead of panicking so callers
    /// get a diagnosable failure.
    #[error("internal error: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal {
            message: msg.into(),
        }
    }
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, Error>;
