//! Lightweight Constraint Solver
//!
//! Decides path conditions without an external SMT solver:
//!
//! 1. Literal-only formulas are decided exactly (constructors fold them).
//! 2. Top-level facts (`x == c`, `x != c`, `x < c`, `arr[c] == d`, boolean
//!    literals) are collected; an empty signed interval or conflicting pins
//!    prove UNSAT.
//! 3. A backtracking search over candidate values (interval bounds, formula
//!    literals and their neighbours, type boundaries) looks for a model,
//!    checking each conjunct as soon as all of its constants are assigned.
//!
//! When every constant has a finite, fully enumerated domain an exhausted
//! search proves UNSAT. Otherwise running out of candidates or budget yields
//! UNKNOWN, never UNSAT.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{ConstraintSolver, SolverResult};
use crate::errors::Result;
use crate::features::smt::domain::{
    ArrayValue, Assignment, BvCompareOp, Evaluator, Expr, ExprKind, Model, Sort, Value,
};

/// Widest interval enumerated exhaustively
const EXHAUSTIVE_SPAN: i128 = 256;

/// Cap on candidates per constant
const MAX_CANDIDATES: usize = 48;

/// Array defaults tried per array constant
const MAX_ARRAY_DEFAULTS: usize = 4;

pub struct LightweightSolver {
    max_assignments: usize,
}

impl LightweightSolver {
    pub fn new(max_assignments: usize) -> Self {
        Self { max_assignments }
    }
}

impl Default for LightweightSolver {
    fn default() -> Self {
        Self::new(50_000)
    }
}

impl ConstraintSolver for LightweightSolver {
    fn name(&self) -> &'static str {
        "lightweight"
    }

    fn check(&mut self, constraints: &[Expr]) -> Result<SolverResult> {
        let mut conjuncts = Vec::new();
        for constraint in constraints {
            flatten(constraint, &mut conjuncts);
        }
        if conjuncts.iter().any(Expr::is_false) {
            return Ok(SolverResult::Unsat);
        }
        conjuncts.retain(|c| !c.is_true());

        let vars = Expr::free_vars(&conjuncts);
        if vars.is_empty() {
            let empty = Assignment::new();
            let mut evaluator = Evaluator::new(&empty);
            for conjunct in &conjuncts {
                match evaluator.eval_bool(conjunct) {
                    Ok(true) => {}
                    Ok(false) => return Ok(SolverResult::Unsat),
                    Err(e) => {
                        debug!("Lightweight solver cannot evaluate: {}", e);
                        return Ok(SolverResult::Unknown);
                    }
                }
            }
            return Ok(SolverResult::Sat(Model::new()));
        }

        let facts = Facts::collect(&conjuncts, &vars);
        if facts.contradiction {
            debug!("Lightweight solver: contradictory facts");
            return Ok(SolverResult::Unsat);
        }

        let literals = collect_literals(&conjuncts);
        let domains: Vec<Domain> = vars
            .iter()
            .map(|(name, sort)| facts.domain(name, sort, &literals))
            .collect();
        if domains.iter().any(|d| d.values.is_empty()) {
            return Ok(if domains.iter().all(|d| d.complete) {
                SolverResult::Unsat
            } else {
                SolverResult::Unknown
            });
        }

        // Each conjunct is checked at the level of its last-assigned constant
        let position: BTreeMap<Arc<str>, usize> = vars
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let mut checks: Vec<Vec<&Expr>> = vec![Vec::new(); domains.len()];
        for conjunct in &conjuncts {
            let level = Expr::free_vars([conjunct])
                .keys()
                .filter_map(|name| position.get(name).copied())
                .max()
                .unwrap_or(0);
            checks[level].push(conjunct);
        }

        let mut search = Search {
            domains: &domains,
            checks: &checks,
            assignment: Assignment::new(),
            budget: self.max_assignments,
            aborted: false,
        };
        if search.run(0) {
            debug!(
                "Lightweight solver: model found after {} assignments",
                self.max_assignments - search.budget
            );
            return Ok(SolverResult::Sat(Model::from_assignment(search.assignment)));
        }
        if !search.aborted && domains.iter().all(|d| d.complete) {
            return Ok(SolverResult::Unsat);
        }
        debug!(
            "Lightweight solver: no model among candidates (aborted: {})",
            search.aborted
        );
        Ok(SolverResult::Unknown)
    }
}

fn flatten(expr: &Expr, out: &mut Vec<Expr>) {
    match expr.kind() {
        ExprKind::And(items) => {
            for item in items {
                flatten(item, out);
            }
        }
        _ => out.push(expr.clone()),
    }
}

/// Literal values occurring anywhere in the formula
struct Literals {
    ints: Vec<i64>,
    floats: Vec<f64>,
}

fn collect_literals(conjuncts: &[Expr]) -> Literals {
    let mut ints = Vec::new();
    let mut floats = Vec::new();
    Expr::visit_dag(conjuncts, |e| match e.kind() {
        ExprKind::BitVec { .. } => {
            if let Some(v) = e.as_bv() {
                if !ints.contains(&v) {
                    ints.push(v);
                }
            }
        }
        ExprKind::Float { .. } => {
            let empty = Assignment::new();
            if let Some(v) = Evaluator::new(&empty).eval(e).ok().and_then(|v| v.as_f64()) {
                if !v.is_nan() && !floats.contains(&v) {
                    floats.push(v);
                }
            }
        }
        _ => {}
    });
    Literals { ints, floats }
}

struct Domain {
    name: Arc<str>,
    values: Vec<Value>,
    /// Values cover every possible model value of the constant
    complete: bool,
}

#[derive(Default)]
struct Facts {
    intervals: BTreeMap<Arc<str>, (i128, i128)>,
    pins: BTreeMap<Arc<str>, Value>,
    excluded: BTreeMap<Arc<str>, Vec<Value>>,
    array_entries: BTreeMap<Arc<str>, Vec<(Value, Value)>>,
    contradiction: bool,
}

fn signed_range(width: u32) -> (i128, i128) {
    let half = 1i128 << (width.min(64) - 1);
    (-half, half - 1)
}

fn literal_value(expr: &Expr) -> Option<Value> {
    if !expr.is_literal() {
        return None;
    }
    let empty = Assignment::new();
    Evaluator::new(&empty).eval(expr).ok()
}

impl Facts {
    fn collect(conjuncts: &[Expr], vars: &BTreeMap<Arc<str>, Sort>) -> Self {
        let mut facts = Facts::default();
        for (name, sort) in vars {
            if let Some(width) = sort.bv_width() {
                facts.intervals.insert(name.clone(), signed_range(width));
            }
        }
        for conjunct in conjuncts {
            facts.learn(conjunct, true);
        }
        facts.check_consistency();
        facts
    }

    fn learn(&mut self, expr: &Expr, positive: bool) {
        match expr.kind() {
            ExprKind::Not(inner) => self.learn(inner, !positive),
            ExprKind::Var(name) if expr.sort().is_bool() => {
                self.pin(name, Value::Bool(positive));
            }
            ExprKind::Eq(a, b) => {
                let (var, lit) = match (a.kind(), b.kind()) {
                    (ExprKind::Var(_), _) if b.is_literal() => (a, b),
                    (_, ExprKind::Var(_)) if a.is_literal() => (b, a),
                    (ExprKind::Select(array, index), _) if positive && b.is_literal() => {
                        self.learn_entry(array, index, b);
                        return;
                    }
                    (_, ExprKind::Select(array, index)) if positive && a.is_literal() => {
                        self.learn_entry(array, index, a);
                        return;
                    }
                    _ => return,
                };
                let (Some(name), Some(value)) = (var.var_name(), literal_value(lit)) else {
                    return;
                };
                if positive {
                    if let Some(c) = value.as_i64() {
                        self.narrow(name, c as i128, c as i128);
                    }
                    self.pin(name, value);
                } else {
                    self.excluded.entry(name.clone()).or_default().push(value);
                }
            }
            ExprKind::BvCompare(op, a, b) => {
                // Normalise to `var op c`
                let (name, c, op) = match (a.var_name(), b.as_bv(), b.var_name(), a.as_bv()) {
                    (Some(name), Some(c), _, _) => (name, c as i128, *op),
                    (_, _, Some(name), Some(c)) => (name, c as i128, flip(*op)),
                    _ => return,
                };
                let op = if positive { op } else { negate(op) };
                match op {
                    BvCompareOp::Slt => self.narrow(name, i128::MIN, c - 1),
                    BvCompareOp::Sle => self.narrow(name, i128::MIN, c),
                    BvCompareOp::Sgt => self.narrow(name, c + 1, i128::MAX),
                    BvCompareOp::Sge => self.narrow(name, c, i128::MAX),
                }
            }
            _ => {}
        }
    }

    fn learn_entry(&mut self, array: &Expr, index: &Expr, value: &Expr) {
        let (Some(name), Some(index), Some(value)) =
            (array.var_name(), literal_value(index), literal_value(value))
        else {
            return;
        };
        let entries = self.array_entries.entry(name.clone()).or_default();
        match entries.iter().find(|(k, _)| k.same(&index)) {
            Some((_, existing)) if !existing.same(&value) => self.contradiction = true,
            Some(_) => {}
            None => entries.push((index, value)),
        }
    }

    fn pin(&mut self, name: &Arc<str>, value: Value) {
        match self.pins.get(name) {
            Some(existing) if !existing.same(&value) => self.contradiction = true,
            Some(_) => {}
            None => {
                self.pins.insert(name.clone(), value);
            }
        }
    }

    fn narrow(&mut self, name: &Arc<str>, lo: i128, hi: i128) {
        if let Some(interval) = self.intervals.get_mut(name) {
            interval.0 = interval.0.max(lo);
            interval.1 = interval.1.min(hi);
        }
    }

    fn check_consistency(&mut self) {
        if self.intervals.values().any(|(lo, hi)| lo > hi) {
            self.contradiction = true;
            return;
        }
        for (name, value) in &self.pins {
            let excluded = self
                .excluded
                .get(name)
                .map_or(false, |values| values.iter().any(|v| v.same(value)));
            if excluded {
                self.contradiction = true;
                return;
            }
        }
    }

    fn is_excluded(&self, name: &str, value: &Value) -> bool {
        self.excluded
            .get(name)
            .map_or(false, |values| values.iter().any(|v| v.same(value)))
    }

    fn domain(&self, name: &Arc<str>, sort: &Sort, literals: &Literals) -> Domain {
        if let Some(value) = self.pins.get(name) {
            return Domain {
                name: name.clone(),
                values: vec![value.clone()],
                complete: true,
            };
        }
        let (values, complete) = match sort {
            Sort::Bool => (vec![Value::Bool(false), Value::Bool(true)], true),
            Sort::BitVec(width) => {
                let (lo, hi) = self
                    .intervals
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| signed_range(*width));
                bv_candidates(*width, lo, hi, literals)
            }
            Sort::Float(fs) => {
                let values = float_candidates(literals)
                    .into_iter()
                    .map(|v| match *fs {
                        crate::features::smt::FloatSort::F32 => Value::F32(v as f32),
                        _ => Value::F64(v),
                    })
                    .collect();
                (values, false)
            }
            Sort::Array(_, element) => {
                let entries = self.array_entries.get(name).cloned().unwrap_or_default();
                let defaults = element_candidates(element, literals);
                let values = defaults
                    .into_iter()
                    .take(MAX_ARRAY_DEFAULTS)
                    .map(|default| {
                        Value::Array(ArrayValue {
                            default: Box::new(default),
                            entries: entries.clone(),
                        })
                    })
                    .collect();
                (values, false)
            }
        };
        let values: Vec<Value> = values
            .into_iter()
            .filter(|v| !self.is_excluded(name, v))
            .collect();
        Domain {
            name: name.clone(),
            values,
            complete,
        }
    }
}

fn flip(op: BvCompareOp) -> BvCompareOp {
    match op {
        BvCompareOp::Slt => BvCompareOp::Sgt,
        BvCompareOp::Sle => BvCompareOp::Sge,
        BvCompareOp::Sgt => BvCompareOp::Slt,
        BvCompareOp::Sge => BvCompareOp::Sle,
    }
}

fn negate(op: BvCompareOp) -> BvCompareOp {
    match op {
        BvCompareOp::Slt => BvCompareOp::Sge,
        BvCompareOp::Sle => BvCompareOp::Sgt,
        BvCompareOp::Sgt => BvCompareOp::Sle,
        BvCompareOp::Sge => BvCompareOp::Slt,
    }
}

fn bv_candidates(width: u32, lo: i128, hi: i128, literals: &Literals) -> (Vec<Value>, bool) {
    if hi - lo < EXHAUSTIVE_SPAN {
        let values = (lo..=hi).map(|v| Value::bv(v as i64, width)).collect();
        return (values, true);
    }
    let (min, max) = signed_range(width);
    let mut raw: Vec<i128> = vec![0, 1, -1];
    for &c in &literals.ints {
        let c = c as i128;
        raw.extend([c, c + 1, c - 1]);
    }
    raw.extend([lo, hi, lo + 1, hi - 1, min, max]);

    let mut values: Vec<i128> = Vec::new();
    for v in raw {
        if v >= lo && v <= hi && !values.contains(&v) {
            values.push(v);
        }
        if values.len() >= MAX_CANDIDATES {
            break;
        }
    }
    let values = values
        .into_iter()
        .map(|v| Value::bv(v as i64, width))
        .collect();
    (values, false)
}

fn float_candidates(literals: &Literals) -> Vec<f64> {
    let mut raw = vec![0.0, 1.0, -1.0];
    for &c in &literals.floats {
        raw.extend([c, c + 1.0, c - 1.0]);
    }
    for &c in &literals.ints {
        raw.push(c as f64);
    }
    raw.extend([0.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);

    let mut values: Vec<f64> = Vec::new();
    for v in raw {
        let seen = values
            .iter()
            .any(|x| x.to_bits() == v.to_bits() || (x.is_nan() && v.is_nan()));
        if !seen {
            values.push(v);
        }
        if values.len() >= MAX_CANDIDATES {
            break;
        }
    }
    values
}

fn element_candidates(sort: &Sort, literals: &Literals) -> Vec<Value> {
    match sort {
        Sort::Bool => vec![Value::Bool(false), Value::Bool(true)],
        Sort::BitVec(width) => {
            let (lo, hi) = signed_range(*width);
            bv_candidates(*width, lo, hi, literals).0
        }
        Sort::Float(fs) => float_candidates(literals)
            .into_iter()
            .map(|v| match *fs {
                crate::features::smt::FloatSort::F32 => Value::F32(v as f32),
                _ => Value::F64(v),
            })
            .collect(),
        Sort::Array(_, element) => element_candidates(element, literals)
            .into_iter()
            .take(MAX_ARRAY_DEFAULTS)
            .map(|default| Value::Array(ArrayValue::constant(default)))
            .collect(),
    }
}

struct Search<'a> {
    domains: &'a [Domain],
    checks: &'a [Vec<&'a Expr>],
    assignment: Assignment,
    budget: usize,
    aborted: bool,
}

impl Search<'_> {
    /// Depth-first assignment of constants `level..`
    fn run(&mut self, level: usize) -> bool {
        let Some(domain) = self.domains.get(level) else {
            return true;
        };
        for value in &domain.values {
            if self.budget == 0 {
                self.aborted = true;
                return false;
            }
            self.budget -= 1;
            self.assignment.insert(domain.name.clone(), value.clone());
            if self.consistent(level) && self.run(level + 1) {
                return true;
            }
            if self.aborted {
                return false;
            }
        }
        self.assignment.remove(&domain.name);
        false
    }

    fn consistent(&self, level: usize) -> bool {
        let mut evaluator = Evaluator::new(&self.assignment);
        self.checks[level]
            .iter()
            .all(|c| matches!(evaluator.eval_bool(c), Ok(true)))
    }
}
