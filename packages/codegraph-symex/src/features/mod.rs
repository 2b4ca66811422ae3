//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure data and invariants (no I/O)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - Algorithms and backend implementations
//!
//! Dependency order, leaves first: smt → symbolic → interprocedural →
//! execution → engine.

// Solver-facing expression language, evaluator and solver backends
pub mod smt;

// Symbolic values, memory, type registry and the SVM
pub mod symbolic;

// Call-instance graphs, paths, taint paths and key-path pruning
pub mod interprocedural;

// Execution states, instruction transfer, traversal and merging
pub mod execution;

// Worklist search and analysis results
pub mod engine;
