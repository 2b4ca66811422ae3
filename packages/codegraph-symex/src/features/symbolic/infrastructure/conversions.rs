//! Sort conversions, operand alignment and primitive casts
//!
//! Conversions follow JVM semantics where the sorts allow it: integer
//! widening sign-extends (zero-extends from `char`), narrowing keeps the low
//! bits, float → integer truncates toward zero with saturation at the `long`
//! or `int` range and maps NaN to zero.

use crate::errors::{Result, SymexError};
use crate::features::smt::{Expr, FloatSort, Sort};
use crate::features::symbolic::domain::sort_of;
use crate::shared::models::Type;

/// Convert `expr` to `to`
pub fn convert(expr: &Expr, to: &Sort) -> Result<Expr> {
    let from = expr.sort();
    if from == to {
        return Ok(expr.clone());
    }
    match (from, to) {
        (Sort::Float(_), Sort::Float(fs)) => Ok(expr.fp_to_fp(*fs)),
        (Sort::BitVec(_), Sort::Float(fs)) => Ok(expr.bv_to_fp(*fs)),
        (Sort::Float(_), Sort::BitVec(width)) => fp_to_bv(expr, *width),
        (Sort::BitVec(width), Sort::Bool) => Ok(expr.equals(&Expr::bv(0, *width)).not()),
        (Sort::Bool, Sort::BitVec(width)) => {
            Ok(expr.ite(&Expr::bv(1, *width), &Expr::bv(0, *width)))
        }
        (Sort::Bool, Sort::Float(_)) => convert(&convert(expr, &Sort::BitVec(32))?, to),
        (Sort::Float(_), Sort::Bool) => convert(&convert(expr, &Sort::BitVec(32))?, to),
        (Sort::BitVec(from_width), Sort::BitVec(to_width)) => {
            Ok(resize(expr, *from_width, *to_width, true))
        }
        _ => Err(SymexError::sort_mismatch(format!(
            "cannot convert {} to {}",
            from, to
        ))),
    }
}

/// Cast a primitive expression of type `from` to type `to`
pub fn cast_primitive(expr: &Expr, from: &Type, to: &Type) -> Result<Expr> {
    if from == to {
        return Ok(expr.clone());
    }
    let target = sort_of(to);
    if *from == Type::Char {
        if let Some(width) = expr.sort().bv_width() {
            let narrow_target = matches!(target, Sort::BitVec(w) if w <= width);
            if !narrow_target {
                return convert(&resize(expr, width, 32, false), &target);
            }
        }
    }
    convert(expr, &target)
}

fn resize(expr: &Expr, from: u32, to: u32, signed: bool) -> Expr {
    match to.cmp(&from) {
        std::cmp::Ordering::Equal => expr.clone(),
        std::cmp::Ordering::Greater if signed => expr.sign_extend(to - from),
        std::cmp::Ordering::Greater => expr.zero_extend(to - from),
        std::cmp::Ordering::Less => expr.extract(to - 1, 0),
    }
}

/// Float → integer: `long` saturates at the `long` range, narrower types go
/// through `int` and keep the low bits
fn fp_to_bv(expr: &Expr, width: u32) -> Result<Expr> {
    let fs = expr
        .sort()
        .float_sort()
        .ok_or_else(|| SymexError::sort_mismatch(format!("{} is not a float", expr)))?;
    if width == 64 {
        return Ok(saturating_fp_to_bv(expr, fs, 64));
    }
    let as_int = saturating_fp_to_bv(expr, fs, 32);
    Ok(resize(&as_int, 32, width, true))
}

/// `±2^(width-1)` are exact in every float format, so the bounds compare
/// against them rather than against the integer extremes
fn saturating_fp_to_bv(expr: &Expr, fs: FloatSort, width: u32) -> Expr {
    let max = i64::MAX >> (64 - width);
    let min = -max - 1;
    let bound = 2f64.powi(width as i32 - 1);
    expr.fp_is_nan().ite(
        &Expr::bv(0, width),
        &expr.fp_lt(&Expr::fp_from_f64(-bound, fs)).ite(
            &Expr::bv(min, width),
            &expr
                .fp_ge(&Expr::fp_from_f64(bound, fs))
                .ite(&Expr::bv(max, width), &expr.fp_to_sbv(width)),
        ),
    )
}

fn rank(sort: &Sort) -> Result<u32> {
    match sort {
        Sort::Float(fs) => Ok(30_000_000 + fs.exponent + fs.significand),
        Sort::Bool => Ok(20_000_000),
        Sort::BitVec(width) => Ok(10_000_000 + width),
        Sort::Array(..) => Err(SymexError::sort_mismatch(format!(
            "array operand of sort {}",
            sort
        ))),
    }
}

/// Bring both operands to a common sort
///
/// Floats win over booleans, booleans over bitvectors, wider over narrower;
/// the result is never narrower than a 32-bit bitvector.
pub fn align(lhs: &Expr, rhs: &Expr) -> Result<(Expr, Expr)> {
    let int = Sort::BitVec(32);
    let mut target = &int;
    for sort in [lhs.sort(), rhs.sort()] {
        if rank(sort)? > rank(target)? {
            target = sort;
        }
    }
    let target = target.clone();
    Ok((convert(lhs, &target)?, convert(rhs, &target)?))
}
