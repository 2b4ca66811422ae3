//! Execution Feature
//!
//! Execution states and the step function over them.
//!
//! # Structure
//! ```text
//! execution/
//! ├── domain/
//! │   ├── state.rs      # ExecutionState, StackElement, Parameter
//! │   └── update.rs     # TransferUpdate, SwitchTarget
//! └── infrastructure/
//!     ├── resolver.rs   # operands, rvalues and places → symbolic values
//!     ├── transfer.rs   # instruction → TransferUpdate
//!     ├── mocking.rs    # enter or mock a call
//!     ├── traverser.rs  # state → successor states
//!     └── merger.rs     # two states at one node → one state
//! ```
//!
//! One step:
//! ```text
//! ExecutionState ─► Traverser::traverse ─► [ExecutionState]
//!                                              │ same node already holds a state?
//!                                              ▼
//!                              ExecutionStateMerger::merge(previous, incoming)
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::{ExecutionState, Parameter, StackElement, SwitchTarget, TransferUpdate};
pub use infrastructure::{
    ExecutionStateMerger, LValue, MockReason, MockingPolicy, Traverser, ValueResolver,
};
