//! Solver-facing expression DAG
//!
//! [`Expr`] is an immutable, reference-counted node with its sort cached.
//! Execution states share sub-expressions freely, so clones are pointer copies
//! and every traversal in this crate works on the DAG (each distinct node
//! visited once) rather than on the unfolded tree.
//!
//! Constructors assume well-sorted operands; the symbolic layer aligns sorts
//! before building. Operations whose operands are all literals are folded
//! immediately through the concrete evaluator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::eval::Evaluator;
use super::model::Assignment;
use super::sort::{FloatSort, Sort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvUnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvBinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

/// Signed bitvector comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvCompareOp {
    Slt,
    Sle,
    Sgt,
    Sge,
}

/// Floating-point arithmetic (round-to-nearest-even, `Rem` is IEEE remainder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// IEEE comparisons (false on NaN)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpCompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Bool(bool),
    /// Literal bitvector, `bits` masked to `width`
    BitVec {
        bits: u64,
        width: u32,
    },
    /// Literal float stored as its IEEE bit pattern
    Float {
        bits: u64,
        sort: FloatSort,
    },
    Var(Arc<str>),
    Not(Expr),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Xor(Expr, Expr),
    Eq(Expr, Expr),
    Ite(Expr, Expr, Expr),
    BvUnary(BvUnaryOp, Expr),
    BvBinary(BvBinaryOp, Expr, Expr),
    BvCompare(BvCompareOp, Expr, Expr),
    SignExtend(u32, Expr),
    ZeroExtend(u32, Expr),
    Extract {
        high: u32,
        low: u32,
        arg: Expr,
    },
    FpNeg(Expr),
    FpBinary(FpBinaryOp, Expr, Expr),
    FpCompare(FpCompareOp, Expr, Expr),
    FpIsNan(Expr),
    /// Float to float of the node's sort
    FpToFp(Expr),
    /// Signed bitvector to float of the node's sort
    BvToFp(Expr),
    /// Float to signed bitvector of the node's width
    FpToSbv(Expr),
    Select(Expr, Expr),
    Store(Expr, Expr, Expr),
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ExprData {
    kind: ExprKind,
    sort: Sort,
}

#[derive(Clone, Eq, Hash)]
pub struct Expr(Arc<ExprData>);

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

pub(crate) fn mask(bits: u64, width: u32) -> u64 {
    if width >= 64 {
        bits
    } else {
        bits & ((1u64 << width) - 1)
    }
}

pub(crate) fn to_signed(bits: u64, width: u32) -> i64 {
    if width >= 64 {
        bits as i64
    } else {
        let shift = 64 - width;
        ((bits << shift) as i64) >> shift
    }
}

impl Expr {
    /// Build without folding
    pub(crate) fn raw(kind: ExprKind, sort: Sort) -> Self {
        Expr(Arc::new(ExprData { kind, sort }))
    }

    /// Build and fold when every operand is a literal
    fn build(kind: ExprKind, sort: Sort) -> Self {
        let expr = Self::raw(kind, sort);
        if expr.is_literal() || matches!(expr.kind(), ExprKind::Var(_)) {
            return expr;
        }
        let foldable = expr.sort().element().is_none()
            && expr.children().iter().all(|c| c.is_literal());
        if !foldable {
            return expr;
        }
        let empty = Assignment::new();
        match Evaluator::new(&empty).eval(&expr) {
            Ok(value) => value.to_literal().unwrap_or(expr),
            Err(_) => expr,
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn sort(&self) -> &Sort {
        &self.0.sort
    }

    /// Stable identity of this node for DAG traversals
    pub fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    // ───────────────────────────────────────────────────────────────────
    // Leaves
    // ───────────────────────────────────────────────────────────────────

    pub fn bool(value: bool) -> Self {
        Self::raw(ExprKind::Bool(value), Sort::Bool)
    }

    pub fn true_() -> Self {
        Self::bool(true)
    }

    pub fn false_() -> Self {
        Self::bool(false)
    }

    /// Bitvector literal from a signed value (two's complement, truncated)
    pub fn bv(value: i64, width: u32) -> Self {
        Self::bv_bits(value as u64, width)
    }

    pub fn bv_bits(bits: u64, width: u32) -> Self {
        Self::raw(
            ExprKind::BitVec {
                bits: mask(bits, width),
                width,
            },
            Sort::BitVec(width),
        )
    }

    pub fn f32(value: f32) -> Self {
        Self::fp_bits(value.to_bits() as u64, FloatSort::F32)
    }

    pub fn f64(value: f64) -> Self {
        Self::fp_bits(value.to_bits(), FloatSort::F64)
    }

    pub fn fp_bits(bits: u64, sort: FloatSort) -> Self {
        Self::raw(
            ExprKind::Float {
                bits: mask(bits, sort.width()),
                sort,
            },
            Sort::Float(sort),
        )
    }

    /// Float literal of `sort` closest to `value`
    pub fn fp_from_f64(value: f64, sort: FloatSort) -> Self {
        if sort == FloatSort::F32 {
            Self::f32(value as f32)
        } else {
            Self::fp_bits(value.to_bits(), sort)
        }
    }

    pub fn var(name: &str, sort: Sort) -> Self {
        Self::raw(ExprKind::Var(Arc::from(name)), sort)
    }

    // ───────────────────────────────────────────────────────────────────
    // Inspection
    // ───────────────────────────────────────────────────────────────────

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind(),
            ExprKind::Bool(_) | ExprKind::BitVec { .. } | ExprKind::Float { .. }
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind() {
            ExprKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.as_bool() == Some(true)
    }

    pub fn is_false(&self) -> bool {
        self.as_bool() == Some(false)
    }

    /// Signed value of a bitvector literal
    pub fn as_bv(&self) -> Option<i64> {
        match self.kind() {
            ExprKind::BitVec { bits, width } => Some(to_signed(*bits, *width)),
            _ => None,
        }
    }

    pub fn var_name(&self) -> Option<&Arc<str>> {
        match self.kind() {
            ExprKind::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Direct operands
    pub fn children(&self) -> Vec<&Expr> {
        match self.kind() {
            ExprKind::Bool(_)
            | ExprKind::BitVec { .. }
            | ExprKind::Float { .. }
            | ExprKind::Var(_) => Vec::new(),
            ExprKind::Not(a)
            | ExprKind::BvUnary(_, a)
            | ExprKind::SignExtend(_, a)
            | ExprKind::ZeroExtend(_, a)
            | ExprKind::Extract { arg: a, .. }
            | ExprKind::FpNeg(a)
            | ExprKind::FpIsNan(a)
            | ExprKind::FpToFp(a)
            | ExprKind::BvToFp(a)
            | ExprKind::FpToSbv(a) => vec![a],
            ExprKind::And(items) | ExprKind::Or(items) => items.iter().collect(),
            ExprKind::Xor(a, b)
            | ExprKind::Eq(a, b)
            | ExprKind::BvBinary(_, a, b)
            | ExprKind::BvCompare(_, a, b)
            | ExprKind::FpBinary(_, a, b)
            | ExprKind::FpCompare(_, a, b)
            | ExprKind::Select(a, b) => vec![a, b],
            ExprKind::Ite(a, b, c) | ExprKind::Store(a, b, c) => vec![a, b, c],
        }
    }

    /// Visit every distinct node reachable from `roots` once, children first
    pub fn visit_dag<'a, F>(roots: impl IntoIterator<Item = &'a Expr>, mut f: F)
    where
        F: FnMut(&'a Expr),
    {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut stack: Vec<(&'a Expr, bool)> = Vec::new();
        for root in roots {
            stack.push((root, false));
            while let Some((expr, expanded)) = stack.pop() {
                if expanded {
                    f(expr);
                    continue;
                }
                if !seen.insert(expr.node_id()) {
                    continue;
                }
                stack.push((expr, true));
                for child in expr.children().into_iter().rev() {
                    if !seen.contains(&child.node_id()) {
                        stack.push((child, false));
                    }
                }
            }
        }
    }

    /// Free constants with their sorts
    pub fn free_vars<'a>(roots: impl IntoIterator<Item = &'a Expr>) -> BTreeMap<Arc<str>, Sort> {
        let mut vars = BTreeMap::new();
        Self::visit_dag(roots, |e| {
            if let ExprKind::Var(name) = e.kind() {
                vars.insert(name.clone(), e.sort().clone());
            }
        });
        vars
    }

    // ───────────────────────────────────────────────────────────────────
    // Boolean
    // ───────────────────────────────────────────────────────────────────

    pub fn not(&self) -> Self {
        if let ExprKind::Not(inner) = self.kind() {
            return inner.clone();
        }
        Self::build(ExprKind::Not(self.clone()), Sort::Bool)
    }

    pub fn and_all(items: impl IntoIterator<Item = Expr>) -> Self {
        let mut kept = Vec::new();
        for item in items {
            match item.as_bool() {
                Some(true) => {}
                Some(false) => return Self::false_(),
                None => kept.push(item),
            }
        }
        match kept.len() {
            0 => Self::true_(),
            1 => kept.remove(0),
            _ => Self::raw(ExprKind::And(kept), Sort::Bool),
        }
    }

    pub fn or_all(items: impl IntoIterator<Item = Expr>) -> Self {
        let mut kept = Vec::new();
        for item in items {
            match item.as_bool() {
                Some(false) => {}
                Some(true) => return Self::true_(),
                None => kept.push(item),
            }
        }
        match kept.len() {
            0 => Self::false_(),
            1 => kept.remove(0),
            _ => Self::raw(ExprKind::Or(kept), Sort::Bool),
        }
    }

    pub fn and(&self, other: &Expr) -> Self {
        Self::and_all([self.clone(), other.clone()])
    }

    pub fn or(&self, other: &Expr) -> Self {
        Self::or_all([self.clone(), other.clone()])
    }

    pub fn xor(&self, other: &Expr) -> Self {
        Self::build(ExprKind::Xor(self.clone(), other.clone()), Sort::Bool)
    }

    /// Structural equality `(= a b)`
    pub fn equals(&self, other: &Expr) -> Self {
        debug_assert_eq!(self.sort(), other.sort());
        if self == other {
            return Self::true_();
        }
        Self::build(ExprKind::Eq(self.clone(), other.clone()), Sort::Bool)
    }

    /// `if self then a else b`
    pub fn ite(&self, then: &Expr, otherwise: &Expr) -> Self {
        debug_assert_eq!(then.sort(), otherwise.sort());
        match self.as_bool() {
            Some(true) => return then.clone(),
            Some(false) => return otherwise.clone(),
            None => {}
        }
        if then == otherwise {
            return then.clone();
        }
        match (then.as_bool(), otherwise.as_bool()) {
            (Some(true), Some(false)) => return self.clone(),
            (Some(false), Some(true)) => return self.not(),
            _ => {}
        }
        Self::raw(
            ExprKind::Ite(self.clone(), then.clone(), otherwise.clone()),
            then.sort().clone(),
        )
    }

    // ───────────────────────────────────────────────────────────────────
    // Bitvector
    // ───────────────────────────────────────────────────────────────────

    fn bv_unary(&self, op: BvUnaryOp) -> Self {
        Self::build(ExprKind::BvUnary(op, self.clone()), self.sort().clone())
    }

    fn bv_binary(&self, op: BvBinaryOp, other: &Expr) -> Self {
        debug_assert_eq!(self.sort(), other.sort());
        Self::build(
            ExprKind::BvBinary(op, self.clone(), other.clone()),
            self.sort().clone(),
        )
    }

    fn bv_compare(&self, op: BvCompareOp, other: &Expr) -> Self {
        debug_assert_eq!(self.sort(), other.sort());
        Self::build(ExprKind::BvCompare(op, self.clone(), other.clone()), Sort::Bool)
    }

    pub fn bv_neg(&self) -> Self {
        self.bv_unary(BvUnaryOp::Neg)
    }

    pub fn bv_not(&self) -> Self {
        self.bv_unary(BvUnaryOp::Not)
    }

    pub fn bv_add(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::Add, other)
    }

    pub fn bv_sub(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::Sub, other)
    }

    pub fn bv_mul(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::Mul, other)
    }

    pub fn bv_sdiv(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::SDiv, other)
    }

    pub fn bv_srem(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::SRem, other)
    }

    pub fn bv_and(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::And, other)
    }

    pub fn bv_or(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::Or, other)
    }

    pub fn bv_xor(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::Xor, other)
    }

    pub fn bv_shl(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::Shl, other)
    }

    pub fn bv_lshr(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::LShr, other)
    }

    pub fn bv_ashr(&self, other: &Expr) -> Self {
        self.bv_binary(BvBinaryOp::AShr, other)
    }

    pub fn bv_slt(&self, other: &Expr) -> Self {
        self.bv_compare(BvCompareOp::Slt, other)
    }

    pub fn bv_sle(&self, other: &Expr) -> Self {
        self.bv_compare(BvCompareOp::Sle, other)
    }

    pub fn bv_sgt(&self, other: &Expr) -> Self {
        self.bv_compare(BvCompareOp::Sgt, other)
    }

    pub fn bv_sge(&self, other: &Expr) -> Self {
        self.bv_compare(BvCompareOp::Sge, other)
    }

    pub fn sign_extend(&self, extra: u32) -> Self {
        let width = self.sort().bv_width().unwrap_or(0);
        if extra == 0 {
            return self.clone();
        }
        Self::build(
            ExprKind::SignExtend(extra, self.clone()),
            Sort::BitVec(width + extra),
        )
    }

    pub fn zero_extend(&self, extra: u32) -> Self {
        let width = self.sort().bv_width().unwrap_or(0);
        if extra == 0 {
            return self.clone();
        }
        Self::build(
            ExprKind::ZeroExtend(extra, self.clone()),
            Sort::BitVec(width + extra),
        )
    }

    /// Bits `high..=low`
    pub fn extract(&self, high: u32, low: u32) -> Self {
        debug_assert!(high >= low);
        if low == 0 && self.sort().bv_width() == Some(high + 1) {
            return self.clone();
        }
        Self::build(
            ExprKind::Extract {
                high,
                low,
                arg: self.clone(),
            },
            Sort::BitVec(high - low + 1),
        )
    }

    // ───────────────────────────────────────────────────────────────────
    // Floating point
    // ───────────────────────────────────────────────────────────────────

    fn fp_binary(&self, op: FpBinaryOp, other: &Expr) -> Self {
        debug_assert_eq!(self.sort(), other.sort());
        Self::build(
            ExprKind::FpBinary(op, self.clone(), other.clone()),
            self.sort().clone(),
        )
    }

    fn fp_compare(&self, op: FpCompareOp, other: &Expr) -> Self {
        debug_assert_eq!(self.sort(), other.sort());
        Self::build(ExprKind::FpCompare(op, self.clone(), other.clone()), Sort::Bool)
    }

    pub fn fp_neg(&self) -> Self {
        Self::build(ExprKind::FpNeg(self.clone()), self.sort().clone())
    }

    pub fn fp_add(&self, other: &Expr) -> Self {
        self.fp_binary(FpBinaryOp::Add, other)
    }

    pub fn fp_sub(&self, other: &Expr) -> Self {
        self.fp_binary(FpBinaryOp::Sub, other)
    }

    pub fn fp_mul(&self, other: &Expr) -> Self {
        self.fp_binary(FpBinaryOp::Mul, other)
    }

    pub fn fp_div(&self, other: &Expr) -> Self {
        self.fp_binary(FpBinaryOp::Div, other)
    }

    pub fn fp_rem(&self, other: &Expr) -> Self {
        self.fp_binary(FpBinaryOp::Rem, other)
    }

    pub fn fp_lt(&self, other: &Expr) -> Self {
        self.fp_compare(FpCompareOp::Lt, other)
    }

    pub fn fp_le(&self, other: &Expr) -> Self {
        self.fp_compare(FpCompareOp::Le, other)
    }

    pub fn fp_gt(&self, other: &Expr) -> Self {
        self.fp_compare(FpCompareOp::Gt, other)
    }

    pub fn fp_ge(&self, other: &Expr) -> Self {
        self.fp_compare(FpCompareOp::Ge, other)
    }

    /// IEEE equality (`+0 == -0`, NaN unequal to itself)
    pub fn fp_eq(&self, other: &Expr) -> Self {
        self.fp_compare(FpCompareOp::Eq, other)
    }

    pub fn fp_is_nan(&self) -> Self {
        Self::build(ExprKind::FpIsNan(self.clone()), Sort::Bool)
    }

    pub fn fp_to_fp(&self, sort: FloatSort) -> Self {
        if self.sort() == &Sort::Float(sort) {
            return self.clone();
        }
        Self::build(ExprKind::FpToFp(self.clone()), Sort::Float(sort))
    }

    /// Signed bitvector to float, round-to-nearest-even
    pub fn bv_to_fp(&self, sort: FloatSort) -> Self {
        Self::build(ExprKind::BvToFp(self.clone()), Sort::Float(sort))
    }

    /// Float to signed bitvector, rounding toward zero
    pub fn fp_to_sbv(&self, width: u32) -> Self {
        Self::build(ExprKind::FpToSbv(self.clone()), Sort::BitVec(width))
    }

    // ───────────────────────────────────────────────────────────────────
    // Arrays
    // ───────────────────────────────────────────────────────────────────

    /// `self` must be an array; callers only select from field and type-tag
    /// arrays
    pub fn select(&self, index: &Expr) -> Self {
        debug_assert!(
            self.sort().element().is_some(),
            "select on non-array {} of sort {}",
            self,
            self.sort()
        );
        let element = self.sort().element().cloned().unwrap_or(Sort::Bool);
        Self::raw(ExprKind::Select(self.clone(), index.clone()), element)
    }

    pub fn store(&self, index: &Expr, value: &Expr) -> Self {
        Self::raw(
            ExprKind::Store(self.clone(), index.clone(), value.clone()),
            self.sort().clone(),
        )
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |f: &mut fmt::Formatter<'_>, op: &str, items: &[&Expr]| -> fmt::Result {
            write!(f, "({}", op)?;
            for item in items {
                write!(f, " {}", item)?;
            }
            write!(f, ")")
        };
        match self.kind() {
            ExprKind::Bool(b) => write!(f, "{}", b),
            ExprKind::BitVec { bits, width } => write!(f, "{}:bv{}", to_signed(*bits, *width), width),
            ExprKind::Float { bits, sort } => {
                if *sort == FloatSort::F32 {
                    write!(f, "{}f", f32::from_bits(*bits as u32))
                } else {
                    write!(f, "{}d", f64::from_bits(*bits))
                }
            }
            ExprKind::Var(name) => write!(f, "{}", name),
            ExprKind::Not(_) => list(f, "not", &self.children()),
            ExprKind::And(_) => list(f, "and", &self.children()),
            ExprKind::Or(_) => list(f, "or", &self.children()),
            ExprKind::Xor(..) => list(f, "xor", &self.children()),
            ExprKind::Eq(..) => list(f, "=", &self.children()),
            ExprKind::Ite(..) => list(f, "ite", &self.children()),
            ExprKind::BvUnary(op, _) => list(f, &format!("bv{:?}", op).to_lowercase(), &self.children()),
            ExprKind::BvBinary(op, ..) => list(f, &format!("bv{:?}", op).to_lowercase(), &self.children()),
            ExprKind::BvCompare(op, ..) => list(f, &format!("bv{:?}", op).to_lowercase(), &self.children()),
            ExprKind::SignExtend(n, _) => list(f, &format!("sext{}", n), &self.children()),
            ExprKind::ZeroExtend(n, _) => list(f, &format!("zext{}", n), &self.children()),
            ExprKind::Extract { high, low, .. } => {
                list(f, &format!("extract{}:{}", high, low), &self.children())
            }
            ExprKind::FpNeg(_) => list(f, "fp.neg", &self.children()),
            ExprKind::FpBinary(op, ..) => list(f, &format!("fp.{:?}", op).to_lowercase(), &self.children()),
            ExprKind::FpCompare(op, ..) => list(f, &format!("fp.{:?}", op).to_lowercase(), &self.children()),
            ExprKind::FpIsNan(_) => list(f, "fp.isNaN", &self.children()),
            ExprKind::FpToFp(_) => list(f, "to_fp", &self.children()),
            ExprKind::BvToFp(_) => list(f, "sbv_to_fp", &self.children()),
            ExprKind::FpToSbv(_) => list(f, "fp_to_sbv", &self.children()),
            ExprKind::Select(..) => list(f, "select", &self.children()),
            ExprKind::Store(..) => list(f, "store", &self.children()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_folding() {
        let five = Expr::bv(5, 32);
        let zero = Expr::bv(0, 32);
        assert!(five.bv_sgt(&zero).is_true());
        assert_eq!(five.bv_add(&Expr::bv(-7, 32)).as_bv(), Some(-2));
        assert_eq!(Expr::bv(-1, 8).sign_extend(24).as_bv(), Some(-1));
        assert_eq!(Expr::bv(-1, 8).zero_extend(24).as_bv(), Some(255));
        assert_eq!(Expr::bv(0x1234, 32).extract(7, 0).as_bv(), Some(0x34));
    }

    #[test]
    fn test_boolean_identities() {
        let x = Expr::var("x", Sort::Bool);
        assert_eq!(Expr::and_all([Expr::true_(), x.clone()]), x);
        assert!(Expr::and_all([Expr::false_(), x.clone()]).is_false());
        assert!(Expr::or_all([x.clone(), Expr::true_()]).is_true());
        assert!(Expr::and_all(Vec::new()).is_true());
        assert!(Expr::or_all(Vec::new()).is_false());
        assert_eq!(x.not().not(), x);
        assert_eq!(x.ite(&Expr::true_(), &Expr::false_()), x);
        assert!(x.equals(&x).is_true());
    }

    #[test]
    fn test_ite_folds_on_literal_condition() {
        let a = Expr::var("a", Sort::BitVec(32));
        let b = Expr::var("b", Sort::BitVec(32));
        assert_eq!(Expr::true_().ite(&a, &b), a);
        assert_eq!(Expr::false_().ite(&a, &b), b);
        assert_eq!(Expr::var("c", Sort::Bool).ite(&a, &a), a);
    }

    #[test]
    fn test_free_vars_visits_shared_nodes_once() {
        let x = Expr::var("x", Sort::BitVec(32));
        let sum = x.bv_add(&x);
        let shared = sum.bv_mul(&sum);
        let mut visits = 0;
        Expr::visit_dag([&shared], |_| visits += 1);
        assert_eq!(visits, 3);

        let vars = Expr::free_vars([&shared, &Expr::var("y", Sort::Bool)]);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("x"), Some(&Sort::BitVec(32)));
    }

    #[test]
    fn test_float_literals() {
        let sum = Expr::f32(1.5).fp_add(&Expr::f32(2.0));
        assert_eq!(sum, Expr::f32(3.5));
        assert!(Expr::f64(f64::NAN).fp_is_nan().is_true());
        assert_eq!(Expr::bv(3, 32).bv_to_fp(FloatSort::F64), Expr::f64(3.0));
    }

    #[test]
    fn test_select_sort() {
        let arr = Expr::var("A_f", Sort::array(Sort::BitVec(32), Sort::Bool));
        let read = arr.select(&Expr::bv(1, 32));
        assert_eq!(read.sort(), &Sort::Bool);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "select on non-array")]
    fn test_select_requires_an_array() {
        let _ = Expr::bv(1, 32).select(&Expr::bv(0, 32));
    }
}
