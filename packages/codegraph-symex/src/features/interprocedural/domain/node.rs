//! Instruction occurrences inside one call instance

use std::fmt;

use serde::Serialize;

use crate::shared::models::{InstrId, MethodRef};

/// One dynamic activation of a method's subgraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CallId(pub u32);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call#{}", self.0)
    }
}

/// Instruction occurrence: (call instance, method, instruction)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Node {
    pub call_id: CallId,
    pub method: MethodRef,
    pub instr: InstrId,
}

impl Node {
    pub fn new(call_id: CallId, method: MethodRef, instr: InstrId) -> Self {
        Self {
            call_id,
            method,
            instr,
        }
    }

    /// Same call instance, another instruction
    pub fn with_instr(&self, instr: InstrId) -> Self {
        Self {
            call_id: self.call_id,
            method: self.method.clone(),
            instr,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({}:{}:{})",
            self.method.qualified_name(),
            self.call_id.0,
            self.instr
        )
    }
}
