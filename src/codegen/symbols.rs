//! Address allocation and symbol tables
//!
//! One flat, process-wide address space is shared by every scope: a single
//! monotonic counter hands out cells for globals, scratch temporaries,
//! procedure return slots, parameters, and locals, so no two names ever
//! collide at the machine level. Scopes are exactly two-tier: the global
//! (`MAIN`) scope plus at most one open procedure scope, resolved current
//! scope first, global scope second.

use crate::ast::{ParamDecl, ParamMode};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// What a name stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A single cell holding a value (or, for parameters, an address)
    Scalar,
    /// A `for`-loop control variable; write-protected, removed at loop exit
    Iterator,
    /// A locally allocated array of `last - first + 1` contiguous cells
    ///
    /// `offset = base - first`, so element address = `offset + index`.
    /// Allocation guarantees `base >= first`, keeping the offset
    /// representable as a machine value.
    Array {
        /// Inclusive lower bound
        first: u64,
        /// Inclusive upper bound
        last: u64,
        /// Base address minus `first`
        offset: u64,
    },
}

/// One named entry in a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// The cell backing this name (for arrays, the first allocated cell)
    pub address: u64,
    /// Scalar, iterator, or array
    pub kind: SymbolKind,
    /// Parameter mode; `ParamMode::None` for plain and unannotated names
    pub mode: ParamMode,
    /// Whether this name is a procedure parameter (its cell holds an
    /// address or array offset rather than a value)
    pub is_param: bool,
    /// Definite-assignment flag; transitions false to true, never back
    pub initialized: bool,
}

impl Symbol {
    /// Whether this name denotes an array (local or passed by reference)
    pub fn is_array(&self) -> bool {
        matches!(self.kind, SymbolKind::Array { .. }) || self.mode == ParamMode::ArrayRef
    }

    /// Whether this name is a loop iterator
    pub fn is_iterator(&self) -> bool {
        self.kind == SymbolKind::Iterator
    }
}

/// A name table owned by one scope
#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new() -> Self {
        Self::default()
    }

    fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    fn insert(&mut self, name: &str, symbol: Symbol, line: usize) -> Result<()> {
        if self.symbols.contains_key(name) {
            return Err(Error::Redeclaration {
                name: name.to_string(),
                line,
            });
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    fn remove(&mut self, name: &str) {
        self.symbols.remove(name);
    }
}

/// Per-procedure metadata
///
/// The single `return_slot` is why procedure calls are not reentrant: a
/// nested call into the same procedure would overwrite the slot before the
/// outer call returns through it. Direct self-calls are rejected at the
/// call site; mutual recursion is assumed absent.
#[derive(Debug, Clone)]
pub struct ProcedureInfo {
    /// Formal parameters, in declaration order
    pub params: Vec<ParamDecl>,
    /// The procedure's private name table (parameters and locals)
    pub locals: Scope,
    /// Instruction index of the body, known once it has been lowered
    pub start: Option<usize>,
    /// Cell holding the return address while a call is in flight
    pub return_slot: u64,
}

impl ProcedureInfo {
    /// Slot address of a formal parameter
    pub fn param_address(&self, name: &str) -> Option<u64> {
        self.locals.get(name).map(|s| s.address)
    }
}

/// Fixed compiler-internal cells shared by every expansion site
///
/// Allocated once, before any user declaration, so arithmetic and condition
/// lowering can address them from any scope. Each expansion fully consumes
/// them before control leaves it; operands are always evaluated before the
/// first store into them, which keeps the cells safe under nested
/// expressions.
#[derive(Debug, Clone, Copy)]
pub struct ScratchCells {
    /// Right comparison operand (stored first)
    pub cmp_right: u64,
    /// Left comparison operand
    pub cmp_left: u64,
    /// Multiplication: running addend
    pub mul_a: u64,
    /// Multiplication: remaining multiplier
    pub mul_b: u64,
    /// Multiplication: accumulated product
    pub mul_res: u64,
    /// Division: dividend, then remainder
    pub div_rem: u64,
    /// Division: shifted divisor copy
    pub div_div: u64,
    /// Division: accumulated quotient
    pub div_quot: u64,
    /// Division: power-of-two weight of the shifted divisor
    pub div_weight: u64,
    /// Spill cell for values that must survive an address computation
    pub stash: u64,
}

/// The address allocator and two-tier symbol table
#[derive(Debug)]
pub struct SymbolTable {
    globals: Scope,
    procedures: HashMap<String, ProcedureInfo>,
    /// Name of the open procedure scope; `None` while in `MAIN`
    current: Option<String>,
    next_address: u64,
    /// The fixed implementation temporaries
    pub scratch: ScratchCells,
}

impl SymbolTable {
    /// Create a table with the scratch cells already allocated
    pub fn new() -> Self {
        let mut next_address = 0u64;
        let mut cell = || {
            let addr = next_address;
            next_address += 1;
            addr
        };
        let scratch = ScratchCells {
            cmp_right: cell(),
            cmp_left: cell(),
            mul_a: cell(),
            mul_b: cell(),
            mul_res: cell(),
            div_rem: cell(),
            div_div: cell(),
            div_quot: cell(),
            div_weight: cell(),
            stash: cell(),
        };
        Self {
            globals: Scope::new(),
            procedures: HashMap::new(),
            current: None,
            next_address,
            scratch,
        }
    }

    fn alloc_cell(&mut self) -> u64 {
        let addr = self.next_address;
        self.next_address += 1;
        addr
    }

    /// Allocate a nameless cell (loop bounds, expression spills)
    pub fn alloc_hidden(&mut self) -> u64 {
        self.alloc_cell()
    }

    fn scope_mut(&mut self) -> &mut Scope {
        match &self.current {
            None => &mut self.globals,
            Some(name) => {
                // The open scope always exists; declare_procedure created it.
                &mut self
                    .procedures
                    .get_mut(name.as_str())
                    .expect("open procedure scope")
                    .locals
            }
        }
    }

    fn scope(&self) -> &Scope {
        match &self.current {
            None => &self.globals,
            Some(name) => {
                &self
                    .procedures
                    .get(name.as_str())
                    .expect("open procedure scope")
                    .locals
            }
        }
    }

    /// Declare a scalar variable in the current scope
    pub fn declare_scalar(&mut self, name: &str, line: usize) -> Result<u64> {
        let address = self.next_address;
        let symbol = Symbol {
            address,
            kind: SymbolKind::Scalar,
            mode: ParamMode::None,
            is_param: false,
            initialized: false,
        };
        self.scope_mut().insert(name, symbol, line)?;
        self.alloc_cell();
        Ok(address)
    }

    /// Declare a loop iterator in the current scope
    ///
    /// Iterators are born initialized (the loop header assigns them) and
    /// write-protected everywhere else.
    pub fn declare_iterator(&mut self, name: &str, line: usize) -> Result<u64> {
        let address = self.next_address;
        let symbol = Symbol {
            address,
            kind: SymbolKind::Iterator,
            mode: ParamMode::None,
            is_param: false,
            initialized: true,
        };
        self.scope_mut().insert(name, symbol, line)?;
        self.alloc_cell();
        Ok(address)
    }

    /// Declare a local array with inclusive bounds `first:last`
    ///
    /// Reserves `last - first + 1` contiguous cells. The block is placed at
    /// `max(counter, first)` so the stored offset is never negative; skipped
    /// addresses are simply never used.
    pub fn declare_array(&mut self, name: &str, first: u64, last: u64, line: usize) -> Result<()> {
        if last < first {
            return Err(Error::ArityOrType {
                message: format!("array '{}' has invalid bounds {}:{}", name, first, last),
                line,
            });
        }
        let base = self.next_address.max(first);
        let symbol = Symbol {
            address: base,
            kind: SymbolKind::Array {
                first,
                last,
                offset: base - first,
            },
            mode: ParamMode::None,
            is_param: false,
            initialized: true,
        };
        self.scope_mut().insert(name, symbol, line)?;
        self.next_address = base + (last - first + 1);
        Ok(())
    }

    /// Declare a procedure: return slot, fresh local scope, parameters
    ///
    /// Every parameter takes exactly one cell, array parameters included (a
    /// parameter slot holds an address or offset, not data). `In` and
    /// array parameters are initialized at call time; `Out` and unannotated
    /// parameters are not. The closed [`ParamMode`] enum is what rejects
    /// unsupported mode tokens - they cannot reach this far.
    pub fn declare_procedure(&mut self, name: &str, params: &[ParamDecl], line: usize) -> Result<()> {
        if self.procedures.contains_key(name) {
            return Err(Error::Redeclaration {
                name: name.to_string(),
                line,
            });
        }
        let return_slot = self.alloc_cell();
        let mut locals = Scope::new();
        for param in params {
            let address = self.alloc_cell();
            let symbol = Symbol {
                address,
                kind: SymbolKind::Scalar,
                mode: param.mode,
                is_param: true,
                initialized: matches!(param.mode, ParamMode::In | ParamMode::ArrayRef),
            };
            locals.insert(&param.name, symbol, param.line)?;
        }
        self.procedures.insert(
            name.to_string(),
            ProcedureInfo {
                params: params.to_vec(),
                locals,
                start: None,
                return_slot,
            },
        );
        Ok(())
    }

    /// Open a procedure's local scope
    pub fn enter_procedure_scope(&mut self, name: &str) -> Result<()> {
        if !self.procedures.contains_key(name) {
            return Err(Error::internal(format!(
                "entering scope of undeclared procedure '{}'",
                name
            )));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Return to the global scope
    pub fn leave_procedure_scope(&mut self) {
        self.current = None;
    }

    /// Name of the procedure currently being lowered, if any
    pub fn current_procedure(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Two-tier lookup: current scope first, then the global scope
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scope()
            .get(name)
            .or_else(|| self.globals.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        if self.scope().get(name).is_some() {
            return self.scope_mut().get_mut(name);
        }
        self.globals.get_mut(name)
    }

    /// Resolve a name or fail with [`Error::UndeclaredName`]
    pub fn resolve(&self, name: &str, line: usize) -> Result<Symbol> {
        self.lookup(name).copied().ok_or_else(|| Error::UndeclaredName {
            name: name.to_string(),
            line,
        })
    }

    /// Whether a name has definitely been assigned
    pub fn is_initialized(&self, name: &str) -> bool {
        self.lookup(name).map(|s| s.initialized).unwrap_or(false)
    }

    /// Record that a name has been assigned; false never returns
    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(symbol) = self.lookup_mut(name) {
            symbol.initialized = true;
        }
    }

    /// Remove a name from the current scope (iterator disposal)
    pub fn remove(&mut self, name: &str) {
        self.scope_mut().remove(name);
    }

    /// Metadata for a declared procedure
    pub fn procedure(&self, name: &str) -> Option<&ProcedureInfo> {
        self.procedures.get(name)
    }

    /// Record the instruction index a procedure body starts at
    pub fn set_procedure_start(&mut self, name: &str, start: usize) -> Result<()> {
        self.procedures
            .get_mut(name)
            .map(|p| p.start = Some(start))
            .ok_or_else(|| Error::internal(format!("no procedure named '{}'", name)))
    }

    /// Start address of a lowered procedure, for call resolution
    pub fn procedure_start(&self, name: &str) -> Option<usize> {
        self.procedures.get(name).and_then(|p| p.start)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
