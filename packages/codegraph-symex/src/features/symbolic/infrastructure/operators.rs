//! Operator dispatch over bitvector, floating-point and boolean operands
//!
//! Operands are aligned first (see [`align`]); the aligned sort picks the
//! family. Shift distances are masked to the operand width like the JVM does.

use crate::errors::{Result, SymexError};
use crate::features::smt::{Expr, Sort};
use crate::shared::models::BinaryOp;

use super::conversions::align;

/// Apply `op` to two operands
pub fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Expr> {
    let (lhs, rhs) = align(lhs, rhs)?;
    match lhs.sort().clone() {
        Sort::BitVec(width) => bv_binary(op, &lhs, &rhs, width),
        Sort::Float(_) => fp_binary(op, &lhs, &rhs),
        Sort::Bool => bool_binary(op, &lhs, &rhs),
        other => Err(unsupported(op, &other)),
    }
}

/// Arithmetic negation, logical negation for booleans
pub fn negate(expr: &Expr) -> Result<Expr> {
    match expr.sort() {
        Sort::BitVec(_) => Ok(expr.bv_neg()),
        Sort::Float(_) => Ok(expr.fp_neg()),
        Sort::Bool => Ok(expr.not()),
        other => Err(SymexError::unsupported(format!("negation of {}", other))),
    }
}

fn unsupported(op: BinaryOp, sort: &Sort) -> SymexError {
    SymexError::unsupported(format!("{:?} on {}", op, sort))
}

fn bv_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, width: u32) -> Result<Expr> {
    let distance = || rhs.bv_and(&Expr::bv((width - 1) as i64, width));
    Ok(match op {
        BinaryOp::Add => lhs.bv_add(rhs),
        BinaryOp::Sub => lhs.bv_sub(rhs),
        BinaryOp::Mul => lhs.bv_mul(rhs),
        BinaryOp::Div => lhs.bv_sdiv(rhs),
        BinaryOp::Rem => lhs.bv_srem(rhs),
        BinaryOp::And => lhs.bv_and(rhs),
        BinaryOp::Or => lhs.bv_or(rhs),
        BinaryOp::Xor => lhs.bv_xor(rhs),
        BinaryOp::Shl => lhs.bv_shl(&distance()),
        BinaryOp::Shr => lhs.bv_ashr(&distance()),
        BinaryOp::Ushr => lhs.bv_lshr(&distance()),
        BinaryOp::Eq => lhs.equals(rhs),
        BinaryOp::Ne => lhs.equals(rhs).not(),
        BinaryOp::Lt => lhs.bv_slt(rhs),
        BinaryOp::Le => lhs.bv_sle(rhs),
        BinaryOp::Gt => lhs.bv_sgt(rhs),
        BinaryOp::Ge => lhs.bv_sge(rhs),
        BinaryOp::Cmp | BinaryOp::Cmpl | BinaryOp::Cmpg => three_way(
            &lhs.bv_sle(rhs),
            &lhs.equals(rhs),
        ),
    })
}

fn fp_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Expr> {
    let either_nan = || lhs.fp_is_nan().or(&rhs.fp_is_nan());
    let ordered = || three_way(&lhs.fp_le(rhs), &lhs.fp_eq(rhs));
    Ok(match op {
        BinaryOp::Add => lhs.fp_add(rhs),
        BinaryOp::Sub => lhs.fp_sub(rhs),
        BinaryOp::Mul => lhs.fp_mul(rhs),
        BinaryOp::Div => lhs.fp_div(rhs),
        BinaryOp::Rem => lhs.fp_rem(rhs),
        BinaryOp::Eq => lhs.fp_eq(rhs),
        BinaryOp::Ne => lhs.fp_eq(rhs).not(),
        BinaryOp::Lt => lhs.fp_lt(rhs),
        BinaryOp::Le => lhs.fp_le(rhs),
        BinaryOp::Gt => lhs.fp_gt(rhs),
        BinaryOp::Ge => lhs.fp_ge(rhs),
        BinaryOp::Cmp => ordered(),
        BinaryOp::Cmpl => either_nan().ite(&Expr::bv(-1, 32), &ordered()),
        BinaryOp::Cmpg => either_nan().ite(&Expr::bv(1, 32), &ordered()),
        BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::Xor
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::Ushr => return Err(unsupported(op, lhs.sort())),
    })
}

fn bool_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Expr> {
    Ok(match op {
        BinaryOp::Eq => lhs.equals(rhs),
        BinaryOp::Ne | BinaryOp::Xor => lhs.xor(rhs),
        BinaryOp::And => lhs.and(rhs),
        BinaryOp::Or => lhs.or(rhs),
        _ => return Err(unsupported(op, lhs.sort())),
    })
}

/// `-1`, `0` or `1` as a 32-bit int
fn three_way(less_or_equal: &Expr, equal: &Expr) -> Expr {
    less_or_equal.ite(
        &equal.ite(&Expr::bv(0, 32), &Expr::bv(-1, 32)),
        &Expr::bv(1, 32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Expr {
        Expr::bv(v, 32)
    }

    fn fold(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        binary(op, &lhs, &rhs).unwrap()
    }

    #[test]
    fn test_integer_arithmetic_folds() {
        assert_eq!(fold(BinaryOp::Add, int(2), int(3)).as_bv(), Some(5));
        assert_eq!(fold(BinaryOp::Div, int(-7), int(2)).as_bv(), Some(-3));
        assert_eq!(fold(BinaryOp::Rem, int(-7), int(2)).as_bv(), Some(-1));
        assert!(fold(BinaryOp::Gt, int(5), int(0)).is_true());
        assert!(fold(BinaryOp::Ne, int(5), int(5)).is_false());
    }

    #[test]
    fn test_mixed_widths_widen() {
        let r = fold(BinaryOp::Add, Expr::bv(1, 64), int(-1));
        assert_eq!(r.sort(), &Sort::BitVec(64));
        assert_eq!(r.as_bv(), Some(0));
    }

    #[test]
    fn test_shift_distance_is_masked() {
        assert_eq!(fold(BinaryOp::Shl, int(1), int(33)).as_bv(), Some(2));
        assert_eq!(fold(BinaryOp::Shr, int(-8), int(1)).as_bv(), Some(-4));
        assert_eq!(fold(BinaryOp::Ushr, int(-1), int(28)).as_bv(), Some(15));
        assert_eq!(
            fold(BinaryOp::Shl, Expr::bv(1, 64), int(65)).as_bv(),
            Some(2)
        );
    }

    #[test]
    fn test_three_way_compare() {
        assert_eq!(fold(BinaryOp::Cmp, Expr::bv(1, 64), Expr::bv(2, 64)).as_bv(), Some(-1));
        assert_eq!(fold(BinaryOp::Cmp, Expr::bv(2, 64), Expr::bv(2, 64)).as_bv(), Some(0));
        assert_eq!(fold(BinaryOp::Cmp, Expr::bv(3, 64), Expr::bv(2, 64)).as_bv(), Some(1));
    }

    #[test]
    fn test_nan_ordering() {
        let nan = Expr::f64(f64::NAN);
        let one = Expr::f64(1.0);
        assert_eq!(fold(BinaryOp::Cmpl, nan.clone(), one.clone()).as_bv(), Some(-1));
        assert_eq!(fold(BinaryOp::Cmpg, nan, one.clone()).as_bv(), Some(1));
        assert_eq!(fold(BinaryOp::Cmpg, Expr::f64(0.5), one).as_bv(), Some(-1));
    }

    #[test]
    fn test_int_promotes_to_float() {
        let r = fold(BinaryOp::Mul, int(3), Expr::f64(0.5));
        assert_eq!(r.sort(), &Sort::Float(crate::features::smt::FloatSort::F64));
    }

    #[test]
    fn test_boolean_operators() {
        let b = Expr::var("b", Sort::Bool);
        assert!(binary(BinaryOp::Eq, &Expr::true_(), &int(1)).unwrap().is_true());
        assert!(binary(BinaryOp::Eq, &b, &int(1)).unwrap().sort().is_bool());
        assert!(binary(BinaryOp::Add, &b, &Expr::true_()).is_err());
        assert!(binary(BinaryOp::Shl, &Expr::f64(1.0), &int(1)).is_err());
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&int(5)).unwrap().as_bv(), Some(-5));
        assert!(negate(&Expr::true_()).unwrap().is_false());
    }
}
