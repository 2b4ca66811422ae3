//! Call mocking policy
//!
//! A call is entered only when its callee has a body, is not a library
//! method and has been entered fewer than `max_method_calls` times on the
//! current state. Anything else is mocked: the result (if any) becomes a fresh
//! value of the declared type and execution continues after the call.

use std::fmt;

use crate::features::execution::domain::ExecutionState;
use crate::shared::models::MethodRef;
use crate::shared::ports::ProgramModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockReason {
    CallLimit,
    Library,
    NoBody,
}

impl fmt::Display for MockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockReason::CallLimit => write!(f, "call limit reached"),
            MockReason::Library => write!(f, "library method"),
            MockReason::NoBody => write!(f, "no body"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MockingPolicy {
    max_method_calls: u32,
}

impl MockingPolicy {
    pub fn new(max_method_calls: u32) -> Self {
        Self { max_method_calls }
    }

    pub fn max_method_calls(&self) -> u32 {
        self.max_method_calls
    }

    /// Why the call to `method` must be mocked, `None` when it can be entered
    pub fn reason(
        &self,
        state: &ExecutionState,
        program: &dyn ProgramModel,
        method: &MethodRef,
    ) -> Option<MockReason> {
        if state.call_count(method) >= self.max_method_calls {
            Some(MockReason::CallLimit)
        } else if program.is_library(method) {
            Some(MockReason::Library)
        } else if program.body(method).is_none() {
            Some(MockReason::NoBody)
        } else {
            None
        }
    }

    pub fn must_mock(
        &self,
        state: &ExecutionState,
        program: &dyn ProgramModel,
        method: &MethodRef,
    ) -> bool {
        self.reason(state, program, method).is_some()
    }
}
