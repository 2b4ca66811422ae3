//! Execution infrastructure: resolution, transfer, stepping and merging

pub mod merger;
pub mod mocking;
pub mod resolver;
pub mod transfer;
pub mod traverser;

pub use merger::ExecutionStateMerger;
pub use mocking::{MockReason, MockingPolicy};
pub use resolver::{LValue, ValueResolver};
pub use transfer::transfer;
pub use traverser::Traverser;
