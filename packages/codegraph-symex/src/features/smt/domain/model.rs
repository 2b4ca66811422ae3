//! Concrete values and models

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::eval::{EvalError, Evaluator};
use super::expr::{to_signed, Expr};
use super::sort::FloatSort;

/// Concrete value of an expression
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    BitVec { bits: u64, width: u32 },
    F32(f32),
    F64(f64),
    Array(ArrayValue),
}

/// Array with a default element and point updates (later entries win)
#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub default: Box<Value>,
    pub entries: Vec<(Value, Value)>,
}

impl ArrayValue {
    pub fn constant(default: Value) -> Self {
        Self {
            default: Box::new(default),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, index: &Value) -> Value {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key.same(index))
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| (*self.default).clone())
    }

    pub fn set(&self, index: Value, value: Value) -> Self {
        let mut entries: Vec<(Value, Value)> = self
            .entries
            .iter()
            .filter(|(key, _)| !key.same(&index))
            .cloned()
            .collect();
        entries.push((index, value));
        Self {
            default: self.default.clone(),
            entries,
        }
    }
}

impl Value {
    pub fn bv(value: i64, width: u32) -> Self {
        Value::BitVec {
            bits: super::expr::mask(value as u64, width),
            width,
        }
    }

    /// Structural equality as in SMT-LIB `=`: NaNs are equal, `+0 != -0`
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (
                Value::BitVec { bits: a, width: wa },
                Value::BitVec { bits: b, width: wb },
            ) => a == b && wa == wb,
            (Value::F32(a), Value::F32(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Value::F64(a), Value::F64(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Value::Array(a), Value::Array(b)) => {
                a.default.same(&b.default)
                    && a.entries.len() == b.entries.len()
                    && a.entries.iter().all(|(k, v)| b.get(k).same(v))
            }
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Signed interpretation of a bitvector
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BitVec { bits, width } => Some(to_signed(*bits, *width)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Literal expression for scalar values
    pub fn to_literal(&self) -> Option<Expr> {
        match self {
            Value::Bool(b) => Some(Expr::bool(*b)),
            Value::BitVec { bits, width } => Some(Expr::bv_bits(*bits, *width)),
            Value::F32(v) => Some(Expr::fp_bits(v.to_bits() as u64, FloatSort::F32)),
            Value::F64(v) => Some(Expr::fp_bits(v.to_bits(), FloatSort::F64)),
            Value::Array(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::BitVec { bits, width } => write!(f, "{}", to_signed(*bits, *width)),
            Value::F32(v) => write!(f, "{}f", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Array(array) => {
                write!(f, "[default {}", array.default)?;
                for (k, v) in &array.entries {
                    write!(f, ", {} -> {}", k, v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Values of free constants by name
pub type Assignment = BTreeMap<Arc<str>, Value>;

/// Satisfying assignment returned by a solver
#[derive(Debug, Clone, Default)]
pub struct Model {
    assignment: Assignment,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assignment(assignment: Assignment) -> Self {
        Self { assignment }
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.assignment.insert(Arc::from(name), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.assignment.get(name)
    }

    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.assignment.iter()
    }

    /// Evaluate an expression under this model
    ///
    /// Fails when the expression mentions a constant the model does not bind.
    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        Evaluator::new(&self.assignment).eval(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::smt::domain::Sort;

    #[test]
    fn test_structural_float_equality() {
        assert!(Value::F64(f64::NAN).same(&Value::F64(f64::NAN)));
        assert!(!Value::F64(0.0).same(&Value::F64(-0.0)));
        assert!(!Value::bv(1, 8).same(&Value::bv(1, 16)));
    }

    #[test]
    fn test_array_get_set() {
        let array = ArrayValue::constant(Value::bv(0, 32))
            .set(Value::bv(1, 32), Value::bv(7, 32))
            .set(Value::bv(1, 32), Value::bv(9, 32));
        assert_eq!(array.entries.len(), 1);
        assert_eq!(array.get(&Value::bv(1, 32)).as_i64(), Some(9));
        assert_eq!(array.get(&Value::bv(2, 32)).as_i64(), Some(0));
    }

    #[test]
    fn test_model_eval() {
        let mut model = Model::new();
        model.insert("x", Value::bv(41, 32));
        let x = Expr::var("x", Sort::BitVec(32));
        let value = model.eval(&x.bv_add(&Expr::bv(1, 32))).unwrap();
        assert_eq!(value.as_i64(), Some(42));
        assert!(model.eval(&Expr::var("y", Sort::Bool)).is_err());
    }
}
