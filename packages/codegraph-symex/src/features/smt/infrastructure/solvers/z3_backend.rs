//! Z3 SMT Solver Backend
//!
//! Queries are rendered to SMT-LIB v2 and parsed by Z3, so every sort and
//! operator of the expression language is supported. Boolean and bitvector
//! constants are read back into the model; arrays and floats are left out.
//!
//! Only available when compiled with `--features z3`.
//!
//! ```bash
//! apt-get install libz3-dev  # Linux
//! cargo build --release --features z3
//! ```

#![cfg(feature = "z3")]

use tracing::debug;
use z3::ast::{Bool, BV};
use z3::{Config, Context, SatResult, Solver};

use super::{ConstraintSolver, SolverResult};
use crate::errors::Result;
use crate::features::smt::domain::{Expr, Model, Sort, Value};
use crate::features::smt::infrastructure::smtlib::to_smtlib;

/// Z3 session; the context lives as long as the backend
pub struct Z3Backend {
    context: Context,
}

impl Z3Backend {
    pub fn new(timeout_ms: u32) -> Self {
        let mut config = Config::new();
        config.set_model_generation(true);
        config.set_timeout_msec(timeout_ms as u64);
        Self {
            context: Context::new(&config),
        }
    }
}

impl ConstraintSolver for Z3Backend {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn check(&mut self, constraints: &[Expr]) -> Result<SolverResult> {
        let script = to_smtlib(constraints);
        debug!(
            "Z3 query: {} constants, {} bytes",
            script.declarations.len(),
            script.text.len()
        );

        let solver = Solver::new(&self.context);
        solver.from_string(script.text.as_str());

        match solver.check() {
            SatResult::Unsat => Ok(SolverResult::Unsat),
            SatResult::Unknown => {
                debug!("Z3 unknown: {:?}", solver.get_reason_unknown());
                Ok(SolverResult::Unknown)
            }
            SatResult::Sat => {
                let mut model = Model::new();
                if let Some(z3_model) = solver.get_model() {
                    for (name, sort) in &script.declarations {
                        match sort {
                            Sort::Bool => {
                                let constant = Bool::new_const(&self.context, name.as_ref());
                                if let Some(b) =
                                    z3_model.eval(&constant, true).and_then(|v| v.as_bool())
                                {
                                    model.insert(name, Value::Bool(b));
                                }
                            }
                            Sort::BitVec(width) if *width <= 64 => {
                                let constant = BV::new_const(&self.context, name.as_ref(), *width);
                                if let Some(bits) =
                                    z3_model.eval(&constant, true).and_then(|v| v.as_u64())
                                {
                                    model.insert(name, Value::BitVec { bits, width: *width });
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Ok(SolverResult::Sat(model))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z3_sat_with_model() {
        let mut backend = Z3Backend::new(5_000);
        let x = Expr::var("x", Sort::BitVec(32));
        let c = x.bv_mul(&Expr::bv(3, 32)).equals(&Expr::bv(21, 32));
        match backend.check(&[c]).unwrap() {
            SolverResult::Sat(model) => {
                assert_eq!(model.get("x").and_then(Value::as_i64), Some(7));
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn test_z3_unsat() {
        let mut backend = Z3Backend::new(5_000);
        let x = Expr::var("x", Sort::BitVec(32));
        let c = x.bv_mul(&x).equals(&Expr::bv(2, 32));
        assert!(backend.check(&[c]).unwrap().is_unsat());
    }
}
