//! Transfer updates: what one instruction asks the traverser to do

use crate::features::smt::Expr;
use crate::features::symbolic::{LocalId, SymbolicValue};
use crate::shared::models::{InstrId, MethodRef};

/// One switch case (or the default) and the constraint selecting it
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTarget {
    pub constraint: Expr,
    pub target: InstrId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferUpdate {
    /// Straight-line instruction; every graph successor is taken
    NoOp,

    /// Identity instruction bound `LocalId`
    ParameterDeclaration(LocalId),

    /// Branch; the edge to `target` gets `on_true`, the others `on_false`
    Conditional {
        on_true: Expr,
        on_false: Expr,
        target: InstrId,
    },

    /// Invoke, with the local receiving the result if any
    MethodCall {
        callee: MethodRef,
        arguments: Vec<SymbolicValue>,
        local_to_update: Option<LocalId>,
    },

    /// Multi-way branch, cases then default
    Switch(Vec<SwitchTarget>),

    /// Return, `void` for `return;`
    Return(SymbolicValue),
}

impl TransferUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            TransferUpdate::NoOp => "no-op",
            TransferUpdate::ParameterDeclaration(_) => "parameter",
            TransferUpdate::Conditional { .. } => "conditional",
            TransferUpdate::MethodCall { .. } => "call",
            TransferUpdate::Switch(_) => "switch",
            TransferUpdate::Return(_) => "return",
        }
    }
}
