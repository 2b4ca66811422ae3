//! Concrete evaluation with SMT-LIB semantics
//!
//! Bitvector division by zero follows SMT-LIB (`bvsdiv x 0` is `-1` for
//! non-negative `x` and `1` otherwise, `bvsrem x 0` is `x`), shifts by the
//! width or more saturate. Only the 32- and 64-bit float formats evaluate.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::expr::{
    mask, to_signed, BvBinaryOp, BvCompareOp, BvUnaryOp, Expr, ExprKind, FpBinaryOp, FpCompareOp,
};
use super::model::{ArrayValue, Assignment, Value};
use super::sort::{FloatSort, Sort};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("unbound constant '{0}'")]
    Unbound(String),

    #[error("cannot evaluate {0}")]
    Unsupported(String),

    #[error("ill-sorted operands in {0}")]
    IllSorted(String),
}

/// Memoising evaluator over one assignment
///
/// Entries hold their node so a cached address is never reused by another
/// node while the evaluator lives.
pub struct Evaluator<'a> {
    assignment: &'a Assignment,
    cache: FxHashMap<usize, (Expr, Value)>,
}

impl<'a> Evaluator<'a> {
    pub fn new(assignment: &'a Assignment) -> Self {
        Self {
            assignment,
            cache: FxHashMap::default(),
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let id = expr.node_id();
        if let Some((_, value)) = self.cache.get(&id) {
            return Ok(value.clone());
        }
        let value = self.eval_node(expr)?;
        if !expr.children().is_empty() {
            self.cache.insert(id, (expr.clone(), value.clone()));
        }
        Ok(value)
    }

    /// Evaluate a boolean expression
    pub fn eval_bool(&mut self, expr: &Expr) -> Result<bool, EvalError> {
        self.eval(expr)?
            .as_bool()
            .ok_or_else(|| EvalError::IllSorted(expr.to_string()))
    }

    fn bv(&mut self, expr: &Expr) -> Result<(u64, u32), EvalError> {
        match self.eval(expr)? {
            Value::BitVec { bits, width } => Ok((bits, width)),
            _ => Err(EvalError::IllSorted(expr.to_string())),
        }
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let ill = || EvalError::IllSorted(expr.to_string());
        Ok(match expr.kind() {
            ExprKind::Bool(b) => Value::Bool(*b),
            ExprKind::BitVec { bits, width } => Value::BitVec {
                bits: *bits,
                width: *width,
            },
            ExprKind::Float { bits, sort } => float_from_bits(*bits, *sort)?,
            ExprKind::Var(name) => self
                .assignment
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::Unbound(name.to_string()))?,
            ExprKind::Not(a) => Value::Bool(!self.eval_bool(a)?),
            ExprKind::And(items) => {
                for item in items {
                    if !self.eval_bool(item)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Value::Bool(true)
            }
            ExprKind::Or(items) => {
                for item in items {
                    if self.eval_bool(item)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Value::Bool(false)
            }
            ExprKind::Xor(a, b) => Value::Bool(self.eval_bool(a)? != self.eval_bool(b)?),
            ExprKind::Eq(a, b) => {
                let a = self.eval(a)?;
                let b = self.eval(b)?;
                Value::Bool(a.same(&b))
            }
            ExprKind::Ite(c, a, b) => {
                if self.eval_bool(c)? {
                    self.eval(a)?
                } else {
                    self.eval(b)?
                }
            }
            ExprKind::BvUnary(op, a) => {
                let (bits, width) = self.bv(a)?;
                let result = match op {
                    BvUnaryOp::Neg => bits.wrapping_neg(),
                    BvUnaryOp::Not => !bits,
                };
                Value::BitVec {
                    bits: mask(result, width),
                    width,
                }
            }
            ExprKind::BvBinary(op, a, b) => {
                let (x, width) = self.bv(a)?;
                let (y, wy) = self.bv(b)?;
                if width != wy {
                    return Err(ill());
                }
                Value::BitVec {
                    bits: mask(bv_binary(*op, x, y, width), width),
                    width,
                }
            }
            ExprKind::BvCompare(op, a, b) => {
                let (x, width) = self.bv(a)?;
                let (y, _) = self.bv(b)?;
                let (x, y) = (to_signed(x, width), to_signed(y, width));
                Value::Bool(match op {
                    BvCompareOp::Slt => x < y,
                    BvCompareOp::Sle => x <= y,
                    BvCompareOp::Sgt => x > y,
                    BvCompareOp::Sge => x >= y,
                })
            }
            ExprKind::SignExtend(extra, a) => {
                let (bits, width) = self.bv(a)?;
                let target = width + extra;
                Value::BitVec {
                    bits: mask(to_signed(bits, width) as u64, target),
                    width: target,
                }
            }
            ExprKind::ZeroExtend(extra, a) => {
                let (bits, width) = self.bv(a)?;
                Value::BitVec {
                    bits,
                    width: width + extra,
                }
            }
            ExprKind::Extract { high, low, arg } => {
                let (bits, _) = self.bv(arg)?;
                let width = high - low + 1;
                Value::BitVec {
                    bits: mask(bits >> low, width),
                    width,
                }
            }
            ExprKind::FpNeg(a) => match self.eval(a)? {
                Value::F32(v) => Value::F32(-v),
                Value::F64(v) => Value::F64(-v),
                _ => return Err(ill()),
            },
            ExprKind::FpBinary(op, a, b) => match (self.eval(a)?, self.eval(b)?) {
                (Value::F32(x), Value::F32(y)) => Value::F32(fp_binary(*op, x as f64, y as f64, true) as f32),
                (Value::F64(x), Value::F64(y)) => Value::F64(fp_binary(*op, x, y, false)),
                _ => return Err(ill()),
            },
            ExprKind::FpCompare(op, a, b) => {
                let (x, y) = match (self.eval(a)?, self.eval(b)?) {
                    (Value::F32(x), Value::F32(y)) => (x as f64, y as f64),
                    (Value::F64(x), Value::F64(y)) => (x, y),
                    _ => return Err(ill()),
                };
                Value::Bool(match op {
                    FpCompareOp::Lt => x < y,
                    FpCompareOp::Le => x <= y,
                    FpCompareOp::Gt => x > y,
                    FpCompareOp::Ge => x >= y,
                    FpCompareOp::Eq => x == y,
                })
            }
            ExprKind::FpIsNan(a) => match self.eval(a)? {
                Value::F32(v) => Value::Bool(v.is_nan()),
                Value::F64(v) => Value::Bool(v.is_nan()),
                _ => return Err(ill()),
            },
            ExprKind::FpToFp(a) => {
                let v = self.eval(a)?.as_f64().ok_or_else(ill)?;
                float_value(v, expr.sort())?
            }
            ExprKind::BvToFp(a) => {
                let (bits, width) = self.bv(a)?;
                let signed = to_signed(bits, width);
                match expr.sort().float_sort() {
                    Some(FloatSort::F32) => Value::F32(signed as f32),
                    Some(FloatSort::F64) => Value::F64(signed as f64),
                    _ => return Err(EvalError::Unsupported(expr.to_string())),
                }
            }
            ExprKind::FpToSbv(a) => {
                let v = self.eval(a)?.as_f64().ok_or_else(ill)?;
                let width = expr.sort().bv_width().ok_or_else(ill)?;
                // `as` saturates and maps NaN to zero
                Value::BitVec {
                    bits: mask(v.trunc() as i64 as u64, width),
                    width,
                }
            }
            ExprKind::Select(array, index) => {
                let index = self.eval(index)?;
                match self.eval(array)? {
                    Value::Array(array) => array.get(&index),
                    _ => return Err(ill()),
                }
            }
            ExprKind::Store(array, index, value) => {
                let index = self.eval(index)?;
                let value = self.eval(value)?;
                match self.eval(array)? {
                    Value::Array(array) => Value::Array(array.set(index, value)),
                    _ => return Err(ill()),
                }
            }
        })
    }
}

fn float_from_bits(bits: u64, sort: FloatSort) -> Result<Value, EvalError> {
    match sort {
        FloatSort::F32 => Ok(Value::F32(f32::from_bits(bits as u32))),
        FloatSort::F64 => Ok(Value::F64(f64::from_bits(bits))),
        other => Err(EvalError::Unsupported(format!(
            "float format ({}, {})",
            other.exponent, other.significand
        ))),
    }
}

fn float_value(v: f64, sort: &Sort) -> Result<Value, EvalError> {
    match sort.float_sort() {
        Some(FloatSort::F32) => Ok(Value::F32(v as f32)),
        Some(FloatSort::F64) => Ok(Value::F64(v)),
        _ => Err(EvalError::Unsupported(format!("conversion to {}", sort))),
    }
}

fn bv_binary(op: BvBinaryOp, x: u64, y: u64, width: u32) -> u64 {
    let sx = to_signed(x, width);
    let sy = to_signed(y, width);
    match op {
        BvBinaryOp::Add => x.wrapping_add(y),
        BvBinaryOp::Sub => x.wrapping_sub(y),
        BvBinaryOp::Mul => x.wrapping_mul(y),
        BvBinaryOp::SDiv => {
            if sy == 0 {
                if sx >= 0 {
                    u64::MAX
                } else {
                    1
                }
            } else {
                sx.wrapping_div(sy) as u64
            }
        }
        BvBinaryOp::SRem => {
            if sy == 0 {
                x
            } else {
                sx.wrapping_rem(sy) as u64
            }
        }
        BvBinaryOp::And => x & y,
        BvBinaryOp::Or => x | y,
        BvBinaryOp::Xor => x ^ y,
        BvBinaryOp::Shl => {
            if y >= width as u64 {
                0
            } else {
                x << y
            }
        }
        BvBinaryOp::LShr => {
            if y >= width as u64 {
                0
            } else {
                x >> y
            }
        }
        BvBinaryOp::AShr => {
            if y >= width as u64 {
                if sx < 0 {
                    u64::MAX
                } else {
                    0
                }
            } else {
                (sx >> y) as u64
            }
        }
    }
}

/// Arithmetic in f64; single-precision callers round the result back
fn fp_binary(op: FpBinaryOp, x: f64, y: f64, single: bool) -> f64 {
    match op {
        FpBinaryOp::Add => x + y,
        FpBinaryOp::Sub => x - y,
        FpBinaryOp::Mul => x * y,
        FpBinaryOp::Div => x / y,
        FpBinaryOp::Rem => ieee_remainder(x, y, single),
    }
}

/// IEEE-754 remainder: `x - y * n` with `n` the integer nearest `x / y`
fn ieee_remainder(x: f64, y: f64, single: bool) -> f64 {
    if x.is_nan() || y.is_nan() || x.is_infinite() || y == 0.0 {
        return f64::NAN;
    }
    if y.is_infinite() {
        return x;
    }
    let quotient = if single {
        ((x / y) as f32) as f64
    } else {
        x / y
    };
    let result = x - y * quotient.round_ties_even();
    if result == 0.0 {
        0.0_f64.copysign(x)
    } else {
        result
    }
}
