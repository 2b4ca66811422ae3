//! Common test utilities for codegraph-symex
//!
//! Builders for method bodies, instructions and taint paths shared by the
//! integration tests.

#![allow(dead_code)]

use codegraph_symex::shared::models::{
    BinaryOp, FieldRef, IdentitySource, Immediate, InstrId, Instruction, InvokeExpr, InvokeKind,
    Local, Place, Rvalue,
};
use codegraph_symex::{
    AnalysisResult, Engine, EngineConfig, MethodBody, MethodRef, Program, TaintPath,
    TaintPathEntry, TaintPathKind, Type,
};

// ============================================================================
// Methods and locals
// ============================================================================

/// Method of class `A` taking `params` ints
pub fn method(name: &str, params: usize) -> MethodRef {
    MethodRef::new("A", name, vec![Type::Int; params], Type::Int)
}

pub fn int(name: &str) -> Local {
    Local::new(name, Type::Int)
}

pub fn body(method: MethodRef, locals: Vec<Local>, instructions: Vec<Instruction>) -> MethodBody {
    MethodBody::new(method, locals, instructions).unwrap()
}

// ============================================================================
// Instructions
// ============================================================================

pub fn param(local: &Local, index: usize) -> Instruction {
    Instruction::Identity {
        local: local.clone(),
        source: IdentitySource::Parameter(index),
    }
}

pub fn assign(local: &Local, value: Rvalue) -> Instruction {
    Instruction::Assign {
        place: Place::Local {
            local: local.clone(),
        },
        value,
    }
}

pub fn assign_int(local: &Local, value: i32) -> Instruction {
    assign(
        local,
        Rvalue::Use {
            value: Immediate::int(value),
        },
    )
}

pub fn binary(op: BinaryOp, lhs: Immediate, rhs: Immediate) -> Rvalue {
    let ty = if op.is_comparison() {
        Type::Boolean
    } else {
        Type::Int
    };
    Rvalue::Binary { op, lhs, rhs, ty }
}

pub fn var(local: &Local) -> Immediate {
    Immediate::Local(local.clone())
}

/// `if local <op> value goto target`
pub fn if_cmp(local: &Local, op: BinaryOp, value: i32, target: u32) -> Instruction {
    Instruction::If {
        condition: binary(op, var(local), Immediate::int(value)),
        target: InstrId(target),
    }
}

pub fn static_call(callee: MethodRef, args: Vec<Immediate>) -> InvokeExpr {
    InvokeExpr {
        kind: InvokeKind::Static,
        method: callee,
        base: None,
        args,
    }
}

/// `local = callee(args)`
pub fn call_into(local: &Local, callee: MethodRef, args: Vec<Immediate>) -> Instruction {
    assign(
        local,
        Rvalue::Invoke {
            invoke: static_call(callee, args),
        },
    )
}

/// Sink call consuming `local`
pub fn sink_call(local: &Local) -> Instruction {
    Instruction::Invoke {
        invoke: static_call(
            MethodRef::new("lib.Sink", "consume", vec![Type::Int], Type::Void),
            vec![var(local)],
        ),
    }
}

pub fn field(class: &str, name: &str) -> FieldRef {
    FieldRef::instance(class, name, Type::Int)
}

// ============================================================================
// Programs and taint paths
// ============================================================================

/// Program whose `lib.*` classes are library code
pub fn program(bodies: Vec<MethodBody>) -> Program {
    let mut program = Program::new();
    for body in bodies {
        program.add_method(body);
    }
    program.add_library_class("lib.Sink");
    program.add_library_class("lib.Source");
    program
}

pub fn entry(kind: TaintPathKind, method: &MethodRef, instr: u32) -> TaintPathEntry {
    TaintPathEntry::new(kind, method.clone(), InstrId(instr))
}

pub fn sink(method: &MethodRef, instr: u32) -> TaintPathEntry {
    TaintPathEntry::sink(method.clone(), InstrId(instr))
}

pub fn taint_path(entries: Vec<TaintPathEntry>) -> TaintPath {
    TaintPath::new(entries).unwrap()
}

// ============================================================================
// Running
// ============================================================================

pub fn analyze(program: &Program, method: &MethodRef, path: &TaintPath) -> AnalysisResult {
    analyze_with(EngineConfig::default(), program, method, path)
}

pub fn analyze_with(
    config: EngineConfig,
    program: &Program,
    method: &MethodRef,
    path: &TaintPath,
) -> AnalysisResult {
    Engine::new(config).unwrap().analyze(program, method, path)
}

/// Integer value the witness assigns to parameter `name`
pub fn witness_int(result: &AnalysisResult, name: &str) -> i64 {
    let witness = result.witness.as_ref().expect("reachable result carries a witness");
    witness
        .parameters
        .iter()
        .find(|p| p.name == name)
        .and_then(|p| p.value.as_ref())
        .expect("parameter has a model value")
        .parse()
        .expect("integer model value")
}

/// Distinct call instances a witness path runs through
pub fn call_instances(result: &AnalysisResult) -> usize {
    let witness = result.witness.as_ref().expect("reachable result carries a witness");
    let ids: std::collections::BTreeSet<&str> = witness
        .path
        .iter()
        .filter_map(|node| node.split(':').nth(1))
        .collect();
    ids.len()
}
