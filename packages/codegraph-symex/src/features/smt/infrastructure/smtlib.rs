//! SMT-LIB v2 printer
//!
//! Nodes referenced more than once are bound with `define-fun` so merged
//! states (where every local is an `ite` over the same path conditions) print
//! in size linear to the DAG.

use std::fmt::Write as _;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::features::smt::domain::{
    BvBinaryOp, BvCompareOp, BvUnaryOp, Expr, ExprKind, FpBinaryOp, FpCompareOp, Sort,
};

/// Printed script plus the constants it declares
#[derive(Debug, Clone)]
pub struct SmtLibScript {
    pub declarations: Vec<(Arc<str>, Sort)>,
    pub text: String,
}

/// Render `constraints` as declarations, shared definitions and one assert each
pub fn to_smtlib(constraints: &[Expr]) -> SmtLibScript {
    let mut refs: FxHashMap<usize, usize> = FxHashMap::default();
    for root in constraints {
        *refs.entry(root.node_id()).or_default() += 1;
    }
    let mut order: Vec<&Expr> = Vec::new();
    Expr::visit_dag(constraints, |e| {
        for child in e.children() {
            *refs.entry(child.node_id()).or_default() += 1;
        }
        order.push(e);
    });

    let declarations: Vec<(Arc<str>, Sort)> = Expr::free_vars(constraints).into_iter().collect();

    let mut printer = Printer {
        names: FxHashMap::default(),
        out: String::new(),
    };
    for (name, sort) in &declarations {
        let _ = writeln!(printer.out, "(declare-const {} {})", symbol(name), sort);
    }

    // `order` is children-first, so definitions precede their uses
    let mut next = 0usize;
    for expr in order {
        let shared = refs.get(&expr.node_id()).copied().unwrap_or(0) > 1;
        if !shared || expr.children().is_empty() {
            continue;
        }
        let body = printer.term(expr);
        let name = format!("_t{}", next);
        next += 1;
        let _ = writeln!(
            printer.out,
            "(define-fun {} () {} {})",
            name,
            expr.sort(),
            body
        );
        printer.names.insert(expr.node_id(), name);
    }

    for root in constraints {
        let term = printer.reference(root);
        let _ = writeln!(printer.out, "(assert {})", term);
    }

    SmtLibScript {
        declarations,
        text: printer.out,
    }
}

/// Quote a symbol unless it is a plain SMT-LIB simple symbol
pub fn symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace(['|', '\\'], "_"))
    }
}

struct Printer {
    names: FxHashMap<usize, String>,
    out: String,
}

impl Printer {
    /// Name of a defined node, or its inline term
    fn reference(&self, expr: &Expr) -> String {
        match self.names.get(&expr.node_id()) {
            Some(name) => name.clone(),
            None => self.term(expr),
        }
    }

    fn app(&self, op: &str, args: &[&Expr]) -> String {
        let mut s = format!("({}", op);
        for arg in args {
            s.push(' ');
            s.push_str(&self.reference(arg));
        }
        s.push(')');
        s
    }

    fn term(&self, expr: &Expr) -> String {
        match expr.kind() {
            ExprKind::Bool(b) => b.to_string(),
            ExprKind::BitVec { bits, width } => format!("(_ bv{} {})", bits, width),
            ExprKind::Float { bits, sort } => format!(
                "((_ to_fp {} {}) (_ bv{} {}))",
                sort.exponent,
                sort.significand,
                bits,
                sort.width()
            ),
            ExprKind::Var(name) => symbol(name),
            ExprKind::Not(a) => self.app("not", &[a]),
            ExprKind::And(items) => self.app("and", &items.iter().collect::<Vec<_>>()),
            ExprKind::Or(items) => self.app("or", &items.iter().collect::<Vec<_>>()),
            ExprKind::Xor(a, b) => self.app("xor", &[a, b]),
            ExprKind::Eq(a, b) => self.app("=", &[a, b]),
            ExprKind::Ite(c, a, b) => self.app("ite", &[c, a, b]),
            ExprKind::BvUnary(op, a) => {
                let name = match op {
                    BvUnaryOp::Neg => "bvneg",
                    BvUnaryOp::Not => "bvnot",
                };
                self.app(name, &[a])
            }
            ExprKind::BvBinary(op, a, b) => {
                let name = match op {
                    BvBinaryOp::Add => "bvadd",
                    BvBinaryOp::Sub => "bvsub",
                    BvBinaryOp::Mul => "bvmul",
                    BvBinaryOp::SDiv => "bvsdiv",
                    BvBinaryOp::SRem => "bvsrem",
                    BvBinaryOp::And => "bvand",
                    BvBinaryOp::Or => "bvor",
                    BvBinaryOp::Xor => "bvxor",
                    BvBinaryOp::Shl => "bvshl",
                    BvBinaryOp::LShr => "bvlshr",
                    BvBinaryOp::AShr => "bvashr",
                };
                self.app(name, &[a, b])
            }
            ExprKind::BvCompare(op, a, b) => {
                let name = match op {
                    BvCompareOp::Slt => "bvslt",
                    BvCompareOp::Sle => "bvsle",
                    BvCompareOp::Sgt => "bvsgt",
                    BvCompareOp::Sge => "bvsge",
                };
                self.app(name, &[a, b])
            }
            ExprKind::SignExtend(n, a) => self.app(&format!("(_ sign_extend {})", n), &[a]),
            ExprKind::ZeroExtend(n, a) => self.app(&format!("(_ zero_extend {})", n), &[a]),
            ExprKind::Extract { high, low, arg } => {
                self.app(&format!("(_ extract {} {})", high, low), &[arg])
            }
            ExprKind::FpNeg(a) => self.app("fp.neg", &[a]),
            ExprKind::FpBinary(op, a, b) => match op {
                FpBinaryOp::Add => self.app("fp.add RNE", &[a, b]),
                FpBinaryOp::Sub => self.app("fp.sub RNE", &[a, b]),
                FpBinaryOp::Mul => self.app("fp.mul RNE", &[a, b]),
                FpBinaryOp::Div => self.app("fp.div RNE", &[a, b]),
                FpBinaryOp::Rem => self.app("fp.rem", &[a, b]),
            },
            ExprKind::FpCompare(op, a, b) => {
                let name = match op {
                    FpCompareOp::Lt => "fp.lt",
                    FpCompareOp::Le => "fp.leq",
                    FpCompareOp::Gt => "fp.gt",
                    FpCompareOp::Ge => "fp.geq",
                    FpCompareOp::Eq => "fp.eq",
                };
                self.app(name, &[a, b])
            }
            ExprKind::FpIsNan(a) => self.app("fp.isNaN", &[a]),
            ExprKind::FpToFp(a) | ExprKind::BvToFp(a) => {
                let fs = expr.sort().float_sort().unwrap_or(crate::features::smt::FloatSort::F64);
                self.app(
                    &format!("(_ to_fp {} {}) RNE", fs.exponent, fs.significand),
                    &[a],
                )
            }
            ExprKind::FpToSbv(a) => {
                let width = expr.sort().bv_width().unwrap_or(32);
                self.app(&format!("(_ fp.to_sbv {}) RTZ", width), &[a])
            }
            ExprKind::Select(a, i) => self.app("select", &[a, i]),
            ExprKind::Store(a, i, v) => self.app("store", &[a, i, v]),
        }
    }
}
