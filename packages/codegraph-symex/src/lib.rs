/*
 * Codegraph Symex - Interprocedural Symbolic Execution
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program model (types, instructions, method bodies) and front-end port
 * - features/    : Vertical slices (smt → symbolic → interprocedural → execution → engine)
 * - config/      : Engine configuration and presets
 *
 * Confirms taint paths: given a method and an ordered list of program points
 * ending at a sink, decides whether some input drives execution through all of
 * them, and produces a witness when it does.
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Traversal helpers thread graph, context and state
#![allow(clippy::type_complexity)] // Persistent map types are spelled out
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::should_implement_trait)] // from_str naming intentional
#![allow(clippy::upper_case_acronyms)] // SMT, SVM naming
#![allow(clippy::len_without_is_empty)] // Size accessors on non-container types

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and ports
pub mod shared;

/// Feature modules (solver → symbolic state → graphs → execution → engine)
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, EngineConfig, Preset, SolverBackend, SolverConfig};
pub use errors::{Result, SymexError};
pub use features::engine::{
    AnalysisResult, AnalysisStats, Engine, PathValidator, Verdict, Witness, WitnessParameter,
};
pub use features::interprocedural::{TaintPath, TaintPathEntry, TaintPathKind};
pub use features::smt::{ConstraintSolver, SolverResult};
pub use shared::models::{MethodBody, MethodRef, Type};
pub use shared::ports::{Program, ProgramModel, ProgramDocument};
