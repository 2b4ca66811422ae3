//! SMT Solver Implementations
//!
//! 1. **LightweightSolver**: literal folding, interval reasoning and bounded
//!    model search (always available)
//! 2. **Z3Backend**: full SMT solver (optional, feature-gated)

use tracing::debug;

use crate::config::{SolverBackend, SolverConfig};
use crate::errors::Result;
use crate::features::smt::domain::{Expr, Model};

pub mod lightweight;

#[cfg(feature = "z3")]
pub mod z3_backend;

pub use lightweight::LightweightSolver;
#[cfg(feature = "z3")]
pub use z3_backend::Z3Backend;

/// Solver port
///
/// A solver session lives as long as the value implementing this trait; each
/// `check` is an independent query over the conjunction of `constraints`.
pub trait ConstraintSolver {
    /// Name of this solver
    fn name(&self) -> &'static str;

    /// Decide the conjunction of `constraints`
    fn check(&mut self, constraints: &[Expr]) -> Result<SolverResult>;
}

/// Solver result
#[derive(Debug, Clone)]
pub enum SolverResult {
    /// Satisfiable, with a model of the free constants
    Sat(Model),

    /// Unsatisfiable (contradiction)
    Unsat,

    /// Unknown (timeout, budget exhausted, unsupported theory)
    Unknown,
}

impl SolverResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, SolverResult::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, SolverResult::Unsat)
    }
}

/// Create the configured solver backend
pub fn create_solver(config: &SolverConfig) -> Result<Box<dyn ConstraintSolver>> {
    config.validate()?;
    debug!("Creating {} solver", config.backend.as_str());
    match config.backend {
        SolverBackend::Lightweight => Ok(Box::new(LightweightSolver::new(config.max_assignments))),
        #[cfg(feature = "z3")]
        SolverBackend::Z3 => Ok(Box::new(Z3Backend::new(config.timeout_ms))),
        #[cfg(not(feature = "z3"))]
        SolverBackend::Z3 => Err(crate::config::ConfigError::BackendUnavailable(
            config.backend.as_str().to_string(),
        )
        .into()),
    }
}
