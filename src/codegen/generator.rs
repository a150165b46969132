//! AST-to-instruction lowering
//!
//! A recursive dispatcher over the closed AST enums. Expression lowering
//! leaves the computed value in the accumulator; the address protocol
//! ([`CodeGenerator::load_reference_address`]) leaves a memory address in
//! register `b`, and every named read/write goes through `RLOAD b` /
//! `RSTORE b`. That indirection is what makes call-by-reference parameters
//! transparent to the rest of the walker: a parameter slot holds the
//! referent's address, a plain variable's address is synthesized as a
//! constant, and the two paths converge before the indirect access.

use crate::ast::{
    Condition, Declaration, Expression, ForDirection, MainBlock, ParamMode, Program,
    ProcedureDecl, Statement, Target,
};
use crate::codegen::arith::DivResult;
use crate::codegen::emitter::{Emitter, JumpKind};
use crate::codegen::instruction::{Instruction, Reg};
use crate::codegen::program::TargetProgram;
use crate::codegen::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::error::{Error, Result};
use tracing::debug;

/// The compiler context: symbol table, emitter, and the walker over both
///
/// Created per compilation and consumed by [`CodeGenerator::compile`];
/// there is no other mutable state.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    pub(super) symbols: SymbolTable,
    pub(super) emitter: Emitter,
}

impl CodeGenerator {
    /// Create a fresh compilation context
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            emitter: Emitter::new(),
        }
    }

    /// Lower a whole program to a fully resolved instruction sequence
    ///
    /// Layout: register resets, a jump over the concatenated procedure
    /// bodies (when any exist), the main block, `HALT`. Call placeholders
    /// are resolved against the recorded procedure start addresses at the
    /// very end.
    pub fn compile(mut self, program: &Program) -> Result<TargetProgram> {
        debug!(procedures = program.procedures.len(), "compiling program");

        for reg in Reg::ALL {
            self.emitter.emit(Instruction::Rst(reg));
        }

        // Register every procedure (return slot + parameter slots) before
        // lowering any body, so calls to later procedures resolve.
        for proc in &program.procedures {
            self.symbols
                .declare_procedure(&proc.name, &proc.params, proc.line)?;
        }

        if !program.procedures.is_empty() {
            let over_bodies = self.emitter.jump_placeholder(JumpKind::Always);
            for proc in &program.procedures {
                self.lower_procedure(proc)?;
            }
            let main_start = self.emitter.position();
            self.emitter.patch(over_bodies, main_start);
        }

        self.lower_main(&program.main)?;
        self.emitter.emit(Instruction::Halt);

        let symbols = &self.symbols;
        self.emitter
            .resolve_calls(|name| symbols.procedure_start(name))?;

        debug!(instructions = self.emitter.position(), "compilation finished");
        self.emitter.finish()
    }

    fn lower_main(&mut self, main: &MainBlock) -> Result<()> {
        self.lower_declarations(&main.declarations)?;
        for stmt in &main.body {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_procedure(&mut self, proc: &ProcedureDecl) -> Result<()> {
        debug!(name = %proc.name, "lowering procedure");
        self.symbols.enter_procedure_scope(&proc.name)?;
        let start = self.emitter.position();
        self.symbols.set_procedure_start(&proc.name, start)?;
        let return_slot = self
            .symbols
            .procedure(&proc.name)
            .map(|p| p.return_slot)
            .ok_or_else(|| Error::internal(format!("no procedure named '{}'", proc.name)))?;

        // The CALL instruction primes the accumulator with the return index.
        self.emitter.emit(Instruction::Store(return_slot));

        self.lower_declarations(&proc.declarations)?;
        for stmt in &proc.body {
            self.lower_statement(stmt)?;
        }

        self.emitter.emit(Instruction::Load(return_slot));
        self.emitter.emit(Instruction::Rtrn);
        self.symbols.leave_procedure_scope();
        Ok(())
    }

    fn lower_declarations(&mut self, declarations: &[Declaration]) -> Result<()> {
        for decl in declarations {
            match decl {
                Declaration::Scalar { name, line } => {
                    self.symbols.declare_scalar(name, *line)?;
                }
                Declaration::Array {
                    name,
                    first,
                    last,
                    line,
                } => {
                    self.symbols.declare_array(name, *first, *last, *line)?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn lower_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Assign {
                target,
                value,
                line,
            } => self.lower_assign(target, value, *line),
            Statement::Read { target, line } => self.lower_read(target, *line),
            Statement::Write { value, line: _ } => {
                self.lower_expression(value)?;
                self.emitter.emit(Instruction::Write);
                Ok(())
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                line: _,
            } => self.lower_if(condition, then_branch, else_branch.as_deref()),
            Statement::While {
                condition,
                body,
                line: _,
            } => self.lower_while(condition, body),
            Statement::Repeat {
                body,
                condition,
                line: _,
            } => self.lower_repeat(body, condition),
            Statement::For {
                iterator,
                from,
                to,
                direction,
                body,
                line,
            } => self.lower_for(iterator, from, to, *direction, body, *line),
            Statement::Call { name, args, line } => self.lower_call(name, args, *line),
        }
    }

    fn lower_assign(&mut self, target: &Target, value: &Expression, line: usize) -> Result<()> {
        let symbol = self.symbols.resolve(&target.name, line)?;
        self.check_writable(&symbol, &target.name, line)?;

        self.lower_expression(value)?;
        // The RHS must survive the target address computation, which may
        // itself evaluate a subscript expression.
        let stash = self.symbols.scratch.stash;
        self.emitter.emit(Instruction::Store(stash));
        self.load_reference_address(&target.name, target.index.as_ref(), line)?;
        self.emitter.emit(Instruction::Load(stash));
        self.emitter.emit(Instruction::Rstore(Reg::B));

        self.symbols.mark_initialized(&target.name);
        Ok(())
    }

    fn lower_read(&mut self, target: &Target, line: usize) -> Result<()> {
        let symbol = self.symbols.resolve(&target.name, line)?;
        self.check_writable(&symbol, &target.name, line)?;

        self.emitter.emit(Instruction::Read);
        let stash = self.symbols.scratch.stash;
        self.emitter.emit(Instruction::Store(stash));
        self.load_reference_address(&target.name, target.index.as_ref(), line)?;
        self.emitter.emit(Instruction::Load(stash));
        self.emitter.emit(Instruction::Rstore(Reg::B));

        self.symbols.mark_initialized(&target.name);
        Ok(())
    }

    /// Write-protection shared by assignment and `read`
    fn check_writable(&self, symbol: &Symbol, name: &str, line: usize) -> Result<()> {
        if symbol.mode == ParamMode::In {
            return Err(Error::ParameterMode {
                message: format!("cannot modify input parameter '{}'", name),
                line,
            });
        }
        if symbol.is_iterator() {
            return Err(Error::ParameterMode {
                message: format!("cannot modify loop iterator '{}'", name),
                line,
            });
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        condition: &Condition,
        then_branch: &[Statement],
        else_branch: Option<&[Statement]>,
    ) -> Result<()> {
        self.lower_condition(condition)?;
        let skip_then = self.emitter.jump_placeholder(JumpKind::IfZero);
        for stmt in then_branch {
            self.lower_statement(stmt)?;
        }
        match else_branch {
            None => {
                let after = self.emitter.position();
                self.emitter.patch(skip_then, after);
            }
            Some(else_stmts) => {
                let skip_else = self.emitter.jump_placeholder(JumpKind::Always);
                let else_start = self.emitter.position();
                self.emitter.patch(skip_then, else_start);
                for stmt in else_stmts {
                    self.lower_statement(stmt)?;
                }
                let after = self.emitter.position();
                self.emitter.patch(skip_else, after);
            }
        }
        Ok(())
    }

    fn lower_while(&mut self, condition: &Condition, body: &[Statement]) -> Result<()> {
        let loop_start = self.emitter.position();
        self.lower_condition(condition)?;
        let exit = self.emitter.jump_placeholder(JumpKind::IfZero);
        for stmt in body {
            self.lower_statement(stmt)?;
        }
        self.emitter.emit(Instruction::Jump(loop_start));
        let after = self.emitter.position();
        self.emitter.patch(exit, after);
        Ok(())
    }

    fn lower_repeat(&mut self, body: &[Statement], condition: &Condition) -> Result<()> {
        let loop_start = self.emitter.position();
        for stmt in body {
            self.lower_statement(stmt)?;
        }
        self.lower_condition(condition)?;
        // Loop continues while the condition is false.
        self.emitter.emit(Instruction::Jzero(loop_start));
        Ok(())
    }

    fn lower_for(
        &mut self,
        iterator: &str,
        from: &Expression,
        to: &Expression,
        direction: ForDirection,
        body: &[Statement],
        line: usize,
    ) -> Result<()> {
        let iter_addr = self.symbols.declare_iterator(iterator, line)?;
        let bound_addr = self.symbols.alloc_hidden();

        // Both bounds are evaluated exactly once, at loop entry.
        self.lower_expression(from)?;
        self.emitter.emit(Instruction::Store(iter_addr));
        self.lower_expression(to)?;
        self.emitter.emit(Instruction::Store(bound_addr));

        let loop_start = self.emitter.position();
        match direction {
            ForDirection::Up => {
                // acc = i - bound; positive once i has passed the bound
                self.emitter.emit(Instruction::Load(bound_addr));
                self.emitter.emit(Instruction::Swp(Reg::B));
                self.emitter.emit(Instruction::Load(iter_addr));
                self.emitter.emit(Instruction::Sub(Reg::B));
            }
            ForDirection::Down => {
                // acc = bound - i; positive once i has dropped below it
                self.emitter.emit(Instruction::Load(iter_addr));
                self.emitter.emit(Instruction::Swp(Reg::B));
                self.emitter.emit(Instruction::Load(bound_addr));
                self.emitter.emit(Instruction::Sub(Reg::B));
            }
        }
        let exit = self.emitter.jump_placeholder(JumpKind::IfPositive);

        for stmt in body {
            self.lower_statement(stmt)?;
        }

        self.emitter.emit(Instruction::Load(iter_addr));
        match direction {
            ForDirection::Up => {
                self.emitter.emit(Instruction::Inc(Reg::A));
                self.emitter.emit(Instruction::Store(iter_addr));
                self.emitter.emit(Instruction::Jump(loop_start));
            }
            ForDirection::Down => {
                // An iterator already at zero must stop here: DEC saturates,
                // so without the guard `for i from n downto 0` would spin.
                let stop = self.emitter.jump_placeholder(JumpKind::IfZero);
                self.emitter.emit(Instruction::Dec(Reg::A));
                self.emitter.emit(Instruction::Store(iter_addr));
                self.emitter.emit(Instruction::Jump(loop_start));
                let after_loop = self.emitter.position();
                self.emitter.patch(stop, after_loop);
            }
        }
        let after = self.emitter.position();
        self.emitter.patch(exit, after);

        self.symbols.remove(iterator);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Procedure calls
    // ------------------------------------------------------------------

    fn lower_call(&mut self, name: &str, args: &[crate::ast::Argument], line: usize) -> Result<()> {
        if self.symbols.current_procedure() == Some(name) {
            return Err(Error::RecursiveCall {
                name: name.to_string(),
                line,
            });
        }
        let proc = self
            .symbols
            .procedure(name)
            .ok_or_else(|| Error::UnknownProcedure {
                name: name.to_string(),
                line,
            })?;
        if args.len() != proc.params.len() {
            return Err(Error::ArityOrType {
                message: format!(
                    "procedure '{}' expects {} argument(s), got {}",
                    name,
                    proc.params.len(),
                    args.len()
                ),
                line,
            });
        }

        // Detach the formal list from the symbol table borrow.
        let formals: Vec<(ParamMode, String, u64)> = proc
            .params
            .iter()
            .map(|p| {
                proc.param_address(&p.name)
                    .map(|addr| (p.mode, p.name.clone(), addr))
                    .ok_or_else(|| {
                        Error::internal(format!("parameter '{}' has no slot", p.name))
                    })
            })
            .collect::<Result<_>>()?;

        for (arg, (mode, param_name, slot)) in args.iter().zip(formals) {
            let source = self.symbols.resolve(&arg.name, arg.line)?;

            if source.is_iterator() && mode != ParamMode::In {
                return Err(Error::ParameterMode {
                    message: format!(
                        "loop iterator '{}' cannot be bound to a writable parameter",
                        arg.name
                    ),
                    line: arg.line,
                });
            }
            if mode == ParamMode::In && !source.initialized {
                return Err(Error::UninitializedUse {
                    name: arg.name.clone(),
                    line: arg.line,
                });
            }
            if source.mode == ParamMode::In && mode != ParamMode::In {
                return Err(Error::ParameterMode {
                    message: format!(
                        "input parameter '{}' cannot be bound to a writable parameter",
                        arg.name
                    ),
                    line: arg.line,
                });
            }
            if source.mode == ParamMode::Out && mode == ParamMode::In {
                return Err(Error::ParameterMode {
                    message: format!(
                        "output parameter '{}' cannot be bound to an input parameter",
                        arg.name
                    ),
                    line: arg.line,
                });
            }
            if mode == ParamMode::ArrayRef && !source.is_array() {
                return Err(Error::ArityOrType {
                    message: format!("parameter '{}' expects an array, got '{}'", param_name, arg.name),
                    line: arg.line,
                });
            }
            if mode != ParamMode::ArrayRef && source.is_array() {
                return Err(Error::ArityOrType {
                    message: format!("array '{}' cannot be passed as a scalar", arg.name),
                    line: arg.line,
                });
            }

            if mode == ParamMode::ArrayRef {
                // The callee's slot receives the array's offset. A forwarded
                // array parameter already holds that offset at runtime.
                match (source.mode, source.kind) {
                    (ParamMode::ArrayRef, _) => {
                        self.emitter.emit(Instruction::Load(source.address));
                    }
                    (_, SymbolKind::Array { offset, .. }) => {
                        self.load_constant(offset);
                    }
                    _ => {
                        return Err(Error::internal(format!(
                            "array argument '{}' has no offset",
                            arg.name
                        )))
                    }
                }
            } else {
                // The callee's slot receives the argument's address.
                self.load_reference_address(&arg.name, None, arg.line)?;
                self.emitter.emit(Instruction::Swp(Reg::B));
            }
            self.emitter.emit(Instruction::Store(slot));

            if mode != ParamMode::In {
                // The callee may write through this argument.
                self.symbols.mark_initialized(&arg.name);
            }
        }

        self.emitter.call_placeholder(name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(super) fn lower_expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Number { value, .. } => {
                self.load_constant(*value);
                Ok(())
            }
            Expression::Identifier { name, line } => {
                let symbol = self.symbols.resolve(name, *line)?;
                if symbol.is_array() {
                    return Err(Error::ArityOrType {
                        message: format!("array '{}' used as a scalar value", name),
                        line: *line,
                    });
                }
                if !symbol.initialized {
                    return Err(Error::UninitializedUse {
                        name: name.clone(),
                        line: *line,
                    });
                }
                self.load_reference_address(name, None, *line)?;
                self.emitter.emit(Instruction::Rload(Reg::B));
                Ok(())
            }
            Expression::ArrayElement { name, index, line } => {
                self.load_reference_address(name, Some(index), *line)?;
                self.emitter.emit(Instruction::Rload(Reg::B));
                Ok(())
            }
            Expression::Binary {
                op,
                left,
                right,
                line: _,
            } => {
                self.lower_expression(left)?;
                // Spill to a per-node cell: a register stash would be
                // clobbered by a nested operation in the right operand.
                let spill = self.symbols.alloc_hidden();
                self.emitter.emit(Instruction::Store(spill));
                self.lower_expression(right)?;
                self.emitter.emit(Instruction::Swp(Reg::B));
                self.emitter.emit(Instruction::Load(spill));
                // acc = left operand, b = right operand
                match op {
                    crate::ast::BinaryOp::Add => self.emitter.emit(Instruction::Add(Reg::B)),
                    crate::ast::BinaryOp::Sub => self.emitter.emit(Instruction::Sub(Reg::B)),
                    crate::ast::BinaryOp::Mul => self.expand_multiplication(),
                    crate::ast::BinaryOp::Div => self.expand_division(DivResult::Quotient),
                    crate::ast::BinaryOp::Mod => self.expand_division(DivResult::Remainder),
                }
                Ok(())
            }
        }
    }

    /// Synthesize a compile-time constant into the accumulator
    ///
    /// The machine has no immediate load: reset, then rebuild the value
    /// bit by bit from the most significant end.
    pub(super) fn load_constant(&mut self, value: u64) {
        self.emitter.emit(Instruction::Rst(Reg::A));
        if value == 0 {
            return;
        }
        let bits = 64 - value.leading_zeros();
        for i in (0..bits).rev() {
            self.emitter.emit(Instruction::Shl(Reg::A));
            if (value >> i) & 1 == 1 {
                self.emitter.emit(Instruction::Inc(Reg::A));
            }
        }
    }

    /// Compute the address of a named location into register `b`
    ///
    /// Scalar parameter: its slot already holds the referent's address.
    /// Plain scalar: the address is a compile-time constant. Array element:
    /// the subscript is evaluated first and parked in `h`, then the base
    /// offset (slot load for array parameters, constant otherwise) is added
    /// to it. Index-first ordering keeps the protocol safe when the
    /// subscript itself contains array accesses.
    pub(super) fn load_reference_address(
        &mut self,
        name: &str,
        index: Option<&Expression>,
        line: usize,
    ) -> Result<()> {
        let symbol = self.symbols.resolve(name, line)?;
        match index {
            None => {
                if symbol.is_array() {
                    return Err(Error::ArityOrType {
                        message: format!("array '{}' used as a scalar", name),
                        line,
                    });
                }
                if symbol.is_param {
                    self.emitter.emit(Instruction::Load(symbol.address));
                } else {
                    self.load_constant(symbol.address);
                }
                self.emitter.emit(Instruction::Swp(Reg::B));
            }
            Some(index_expr) => {
                if !symbol.is_array() {
                    return Err(Error::ArityOrType {
                        message: format!("'{}' is not an array", name),
                        line,
                    });
                }
                // Literal subscripts into local arrays are range-checked at
                // compile time; array parameters have unknowable bounds.
                if let (
                    Expression::Number { value, .. },
                    SymbolKind::Array { first, last, .. },
                ) = (index_expr, symbol.kind)
                {
                    if *value < first || *value > last {
                        return Err(Error::IndexRange {
                            name: name.to_string(),
                            index: *value,
                            first,
                            last,
                            line,
                        });
                    }
                }

                self.lower_expression(index_expr)?;
                self.emitter.emit(Instruction::Swp(Reg::H));
                match (symbol.mode, symbol.kind) {
                    (ParamMode::ArrayRef, _) => {
                        self.emitter.emit(Instruction::Load(symbol.address));
                    }
                    (_, SymbolKind::Array { offset, .. }) => {
                        self.load_constant(offset);
                    }
                    _ => {
                        return Err(Error::internal(format!("array '{}' has no offset", name)))
                    }
                }
                self.emitter.emit(Instruction::Add(Reg::H));
                self.emitter.emit(Instruction::Swp(Reg::B));
            }
        }
        Ok(())
    }
}
