//! Execution domain: states, frames and transfer updates

pub mod state;
pub mod update;

pub use state::{ExecutionState, Parameter, StackElement};
pub use update::{SwitchTarget, TransferUpdate};
