//! SMT Feature
//!
//! Solver-facing expression language and the solver port.
//!
//! - `domain`: [`Expr`] DAG, sorts, evaluator, models
//! - `infrastructure`: SMT-LIB printer, [`ConstraintSolver`] backends

pub mod domain;
pub mod infrastructure;

pub use domain::{Expr, FloatSort, Model, Sort, Value};
pub use infrastructure::solvers::{create_solver, ConstraintSolver, SolverResult};
