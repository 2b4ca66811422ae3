//! SMT domain: sorts, expressions, concrete values and models

pub mod eval;
pub mod expr;
pub mod model;
pub mod sort;

pub use eval::{EvalError, Evaluator};
pub use expr::{BvBinaryOp, BvCompareOp, BvUnaryOp, Expr, ExprKind, FpBinaryOp, FpCompareOp};
pub use model::{ArrayValue, Assignment, Model, Value};
pub use sort::{FloatSort, Sort};
