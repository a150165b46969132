//! Shared test harness: AST builders and a target-machine interpreter
//!
//! The interpreter implements the abstract register machine the compiler
//! targets (registers `a`-`h`, flat memory, saturating arithmetic, queue
//! I/O) so end-to-end tests can execute compiled programs and assert on
//! their output. It exists only for tests; the crate ships no runtime.

#![allow(dead_code)]

use lira::ast::{
    Argument, BinaryOp, Condition, Declaration, Expression, ForDirection, MainBlock, ParamDecl,
    ParamMode, ProcedureDecl, Program, RelOp, Statement, Target,
};
use lira::codegen::{Instruction, Reg, TargetProgram};
use std::collections::HashMap;

const STEP_LIMIT: u64 = 5_000_000;

fn reg_index(reg: Reg) -> usize {
    match reg {
        Reg::A => 0,
        Reg::B => 1,
        Reg::C => 2,
        Reg::D => 3,
        Reg::E => 4,
        Reg::F => 5,
        Reg::G => 6,
        Reg::H => 7,
    }
}

/// Execute a compiled program, feeding `input` to `READ` and collecting
/// everything `WRITE` emits. Panics on runaway programs or input underrun;
/// both indicate a codegen bug in the test at hand.
pub fn run_machine(program: &TargetProgram, input: &[u64]) -> Vec<u64> {
    let code = program.instructions();
    let mut regs = [0u64; 8];
    let mut memory: HashMap<u64, u64> = HashMap::new();
    let mut input = input.iter().copied();
    let mut output = Vec::new();
    let mut pc = 0usize;
    let mut steps = 0u64;

    while pc < code.len() {
        steps += 1;
        assert!(steps <= STEP_LIMIT, "step limit exceeded at pc {}", pc);
        let mut next = pc + 1;
        match code[pc] {
            Instruction::Rst(r) => regs[reg_index(r)] = 0,
            Instruction::Inc(r) => regs[reg_index(r)] += 1,
            Instruction::Dec(r) => {
                let i = reg_index(r);
                regs[i] = regs[i].saturating_sub(1);
            }
            Instruction::Shl(r) => regs[reg_index(r)] *= 2,
            Instruction::Shr(r) => regs[reg_index(r)] /= 2,
            Instruction::Add(r) => regs[0] += regs[reg_index(r)],
            Instruction::Sub(r) => regs[0] = regs[0].saturating_sub(regs[reg_index(r)]),
            Instruction::Swp(r) => regs.swap(0, reg_index(r)),
            Instruction::Load(addr) => regs[0] = memory.get(&addr).copied().unwrap_or(0),
            Instruction::Store(addr) => {
                memory.insert(addr, regs[0]);
            }
            Instruction::Rload(r) => {
                let addr = regs[reg_index(r)];
                regs[0] = memory.get(&addr).copied().unwrap_or(0);
            }
            Instruction::Rstore(r) => {
                let addr = regs[reg_index(r)];
                memory.insert(addr, regs[0]);
            }
            Instruction::Jump(target) => next = target,
            Instruction::Jzero(target) => {
                if regs[0] == 0 {
                    next = target;
                }
            }
            Instruction::Jpos(target) => {
                if regs[0] > 0 {
                    next = target;
                }
            }
            Instruction::Call(target) => {
                regs[0] = (pc + 1) as u64;
                next = target;
            }
            Instruction::Rtrn => next = regs[0] as usize,
            Instruction::Read => regs[0] = input.next().expect("READ with empty input"),
            Instruction::Write => output.push(regs[0]),
            Instruction::Halt => break,
        }
        pc = next;
    }
    output
}

/// Compile and execute in one step
pub fn compile_and_run(program: &Program, input: &[u64]) -> Vec<u64> {
    let compiled = lira::codegen::compile(program).expect("compilation failed");
    run_machine(&compiled, input)
}

// ---------------------------------------------------------------------
// AST builders (all nodes on line 1; tests that assert on lines build
// their nodes by hand)
// ---------------------------------------------------------------------

pub fn num(value: u64) -> Expression {
    Expression::Number { value, line: 1 }
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier {
        name: name.to_string(),
        line: 1,
    }
}

pub fn elem(name: &str, index: Expression) -> Expression {
    Expression::ArrayElement {
        name: name.to_string(),
        index: Box::new(index),
        line: 1,
    }
}

pub fn binop(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        line: 1,
    }
}

pub fn cond(op: RelOp, left: Expression, right: Expression) -> Condition {
    Condition {
        op,
        left,
        right,
        line: 1,
    }
}

pub fn scalar(name: &str) -> Declaration {
    Declaration::Scalar {
        name: name.to_string(),
        line: 1,
    }
}

pub fn array(name: &str, first: u64, last: u64) -> Declaration {
    Declaration::Array {
        name: name.to_string(),
        first,
        last,
        line: 1,
    }
}

pub fn target(name: &str) -> Target {
    Target {
        name: name.to_string(),
        index: None,
        line: 1,
    }
}

pub fn target_elem(name: &str, index: Expression) -> Target {
    Target {
        name: name.to_string(),
        index: Some(index),
        line: 1,
    }
}

pub fn assign(name: &str, value: Expression) -> Statement {
    Statement::Assign {
        target: target(name),
        value,
        line: 1,
    }
}

pub fn assign_elem(name: &str, index: Expression, value: Expression) -> Statement {
    Statement::Assign {
        target: target_elem(name, index),
        value,
        line: 1,
    }
}

pub fn read(name: &str) -> Statement {
    Statement::Read {
        target: target(name),
        line: 1,
    }
}

pub fn write(value: Expression) -> Statement {
    Statement::Write { value, line: 1 }
}

pub fn if_then(condition: Condition, then_branch: Vec<Statement>) -> Statement {
    Statement::If {
        condition,
        then_branch,
        else_branch: None,
        line: 1,
    }
}

pub fn if_else(
    condition: Condition,
    then_branch: Vec<Statement>,
    else_branch: Vec<Statement>,
) -> Statement {
    Statement::If {
        condition,
        then_branch,
        else_branch: Some(else_branch),
        line: 1,
    }
}

pub fn while_loop(condition: Condition, body: Vec<Statement>) -> Statement {
    Statement::While {
        condition,
        body,
        line: 1,
    }
}

pub fn repeat_until(body: Vec<Statement>, condition: Condition) -> Statement {
    Statement::Repeat {
        body,
        condition,
        line: 1,
    }
}

pub fn for_up(iterator: &str, from: Expression, to: Expression, body: Vec<Statement>) -> Statement {
    Statement::For {
        iterator: iterator.to_string(),
        from,
        to,
        direction: ForDirection::Up,
        body,
        line: 1,
    }
}

pub fn for_down(
    iterator: &str,
    from: Expression,
    to: Expression,
    body: Vec<Statement>,
) -> Statement {
    Statement::For {
        iterator: iterator.to_string(),
        from,
        to,
        direction: ForDirection::Down,
        body,
        line: 1,
    }
}

pub fn call(name: &str, args: &[&str]) -> Statement {
    Statement::Call {
        name: name.to_string(),
        args: args
            .iter()
            .map(|a| Argument {
                name: a.to_string(),
                line: 1,
            })
            .collect(),
        line: 1,
    }
}

pub fn param(mode: ParamMode, name: &str) -> ParamDecl {
    ParamDecl {
        mode,
        name: name.to_string(),
        line: 1,
    }
}

pub fn procedure(
    name: &str,
    params: Vec<ParamDecl>,
    declarations: Vec<Declaration>,
    body: Vec<Statement>,
) -> ProcedureDecl {
    ProcedureDecl {
        name: name.to_string(),
        params,
        declarations,
        body,
        line: 1,
    }
}

/// A program with no procedures
pub fn main_program(declarations: Vec<Declaration>, body: Vec<Statement>) -> Program {
    program(vec![], declarations, body)
}

pub fn program(
    procedures: Vec<ProcedureDecl>,
    declarations: Vec<Declaration>,
    body: Vec<Statement>,
) -> Program {
    Program {
        procedures,
        main: MainBlock {
            declarations,
            body,
            line: 1,
        },
    }
}
