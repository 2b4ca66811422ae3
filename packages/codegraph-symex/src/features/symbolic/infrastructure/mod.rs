//! Symbolic infrastructure: naming, typing, operators and the SVM

pub mod context;
pub mod conversions;
pub mod operators;
pub mod svm;
pub mod type_registry;

pub use context::SymbolicContext;
pub use svm::{ite_expr, SymbolicVirtualMachine};
pub use type_registry::{TypeRegistry, TYPE_TAG_ARRAY};
