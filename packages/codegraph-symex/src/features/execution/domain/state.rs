//! Execution states
//!
//! An execution state is everything the search knows at one node: how it got
//! there, the call stack, the symbolic state, how many states were merged into
//! it and how often each method was entered. States are persistent values;
//! every transition builds a new one and leaves the old state intact.

use imbl::{OrdMap, Vector};

use crate::features::interprocedural::{Node, Path};
use crate::features::symbolic::{LocalId, SymbolicState, SymbolicValue};
use crate::shared::models::{InstrId, MethodRef};

/// Parameter bound by an identity instruction, kept for model extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: LocalId,
    pub value: SymbolicValue,
}

/// One call frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackElement {
    /// Call site, `None` for the outermost frame
    pub caller: Option<Node>,
    pub parameters: Vector<Parameter>,
    /// Local receiving the return value
    pub local_to_update: Option<LocalId>,
}

impl StackElement {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn call(caller: Node, local_to_update: Option<LocalId>) -> Self {
        Self {
            caller: Some(caller),
            parameters: Vector::new(),
            local_to_update,
        }
    }

    pub fn with_parameter(&self, parameter: Parameter) -> Self {
        let mut parameters = self.parameters.clone();
        parameters.push_back(parameter);
        Self {
            parameters,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionState {
    path: Path,
    stack: Vector<StackElement>,
    symbolic: SymbolicState,
    times_merged: u32,
    call_counts: OrdMap<MethodRef, u32>,
}

impl ExecutionState {
    /// State at the entry node of the analyzed method
    pub fn initial(entry: Node) -> Self {
        Self {
            path: Path::new(entry),
            stack: Vector::unit(StackElement::root()),
            symbolic: SymbolicState::new(),
            times_merged: 0,
            call_counts: OrdMap::new(),
        }
    }

    pub fn from_parts(
        path: Path,
        stack: Vector<StackElement>,
        symbolic: SymbolicState,
        times_merged: u32,
        call_counts: OrdMap<MethodRef, u32>,
    ) -> Self {
        let stack = if stack.is_empty() {
            Vector::unit(StackElement::root())
        } else {
            stack
        };
        Self {
            path,
            stack,
            symbolic,
            times_merged,
            call_counts,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stack(&self) -> &Vector<StackElement> {
        &self.stack
    }

    /// Innermost frame
    pub fn top_frame(&self) -> &StackElement {
        &self.stack[self.stack.len() - 1]
    }

    /// Outermost frame
    pub fn root_frame(&self) -> &StackElement {
        &self.stack[0]
    }

    pub fn symbolic_state(&self) -> &SymbolicState {
        &self.symbolic
    }

    pub fn times_merged(&self) -> u32 {
        self.times_merged
    }

    pub fn call_counts(&self) -> &OrdMap<MethodRef, u32> {
        &self.call_counts
    }

    pub fn call_count(&self, method: &MethodRef) -> u32 {
        self.call_counts.get(method).copied().unwrap_or(0)
    }

    pub fn top_node(&self) -> &Node {
        self.path.last()
    }

    pub fn top_method(&self) -> &MethodRef {
        &self.path.last().method
    }

    pub fn top_instr(&self) -> InstrId {
        self.path.last().instr
    }

    // ───────────────────────────────────────────────────────────────────
    // Transitions
    // ───────────────────────────────────────────────────────────────────

    /// Move to `node` with a new symbolic state, same stack
    pub fn advance(&self, node: Node, symbolic: SymbolicState) -> Self {
        Self {
            path: self.path.push(node),
            symbolic,
            ..self.clone()
        }
    }

    /// Replace the innermost frame
    pub fn with_top_frame(&self, frame: StackElement) -> Self {
        let mut stack = self.stack.clone();
        let top = stack.len() - 1;
        stack.set(top, frame);
        Self {
            stack,
            ..self.clone()
        }
    }

    /// Enter a call: push `frame`, count the call to `method`
    pub fn with_call(&self, frame: StackElement, method: &MethodRef) -> Self {
        let mut stack = self.stack.clone();
        stack.push_back(frame);
        let count = self.call_count(method) + 1;
        Self {
            stack,
            call_counts: self.call_counts.update(method.clone(), count),
            ..self.clone()
        }
    }

    /// Pop the innermost frame; the outermost frame is never popped
    pub fn with_frame_popped(&self) -> Self {
        let mut stack = self.stack.clone();
        if stack.len() > 1 {
            stack.pop_back();
        }
        Self {
            stack,
            ..self.clone()
        }
    }

    /// Replace the whole stack with a fresh outermost frame
    pub fn with_root_stack(&self) -> Self {
        Self {
            stack: Vector::unit(StackElement::root()),
            ..self.clone()
        }
    }
}
