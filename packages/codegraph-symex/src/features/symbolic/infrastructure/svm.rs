//! Symbolic Virtual Machine
//!
//! Builds typed symbolic values against one [`SymbolicState`]. The SVM never
//! mutates the state: every effect (local writes, heap stores, constraints,
//! allocations) is buffered as a [`SymbolicStateUpdate`] and drained once per
//! instruction with [`SymbolicVirtualMachine::collect_updates`].

use tracing::trace;

use super::context::SymbolicContext;
use super::conversions::{cast_primitive, convert};
use super::operators;
use crate::errors::{Result, SymexError};
use crate::features::smt::{Expr, Sort};
use crate::features::symbolic::domain::{
    address_sort, null_address, sort_of, ChunkDescriptor, LocalId, MemoryUpdate, PrimitiveValue,
    ReferenceValue, SymbolicState, SymbolicStateUpdate, SymbolicValue, ADDRESS_WIDTH,
};
use crate::shared::models::{BinaryOp, Constant, FieldRef, Type};

pub struct SymbolicVirtualMachine<'a> {
    context: &'a mut SymbolicContext,
    state: &'a SymbolicState,
    updates: Vec<SymbolicStateUpdate>,
    next_address: u32,
}

impl<'a> SymbolicVirtualMachine<'a> {
    pub fn new(context: &'a mut SymbolicContext, state: &'a SymbolicState) -> Self {
        Self {
            next_address: state.next_address(),
            context,
            state,
            updates: Vec::new(),
        }
    }

    pub fn state(&self) -> &SymbolicState {
        self.state
    }

    /// Drain the buffered updates
    pub fn collect_updates(&mut self) -> Vec<SymbolicStateUpdate> {
        std::mem::take(&mut self.updates)
    }

    pub fn assert(&mut self, constraint: Expr) {
        self.updates.push(SymbolicStateUpdate::Constraint(constraint));
    }

    // ───────────────────────────────────────────────────────────────────
    // Fresh values and locals
    // ───────────────────────────────────────────────────────────────────

    /// Fresh unconstrained value of `ty`
    ///
    /// References are constrained to be of type `ty` or `null`.
    pub fn create_const(&mut self, ty: &Type) -> SymbolicValue {
        match ty {
            Type::Void => SymbolicValue::void(),
            Type::Null => SymbolicValue::null(),
            Type::Ref(_) | Type::Array(_) => {
                let addr = Expr::var(&self.context.fresh_local_name(), address_sort());
                let constraint = self.context.types_mut().type_or_null_constraint(&addr, ty);
                self.assert(constraint);
                SymbolicValue::reference(ty.clone(), addr)
            }
            _ => {
                let expr = Expr::var(&self.context.fresh_local_name(), sort_of(ty));
                SymbolicValue::primitive(ty.clone(), expr)
            }
        }
    }

    /// Bind `id` to a fresh value of its declared type
    pub fn create_local(&mut self, id: &LocalId) -> SymbolicValue {
        let value = self.create_const(&id.ty);
        self.update_local(id, value.clone());
        value
    }

    pub fn update_local(&mut self, id: &LocalId, value: SymbolicValue) {
        self.updates.push(SymbolicStateUpdate::Memory(MemoryUpdate::Local {
            id: id.clone(),
            value,
        }));
    }

    /// Current value of a local, including writes buffered by this SVM
    pub fn local(&self, id: &LocalId) -> Option<SymbolicValue> {
        let pending = self.updates.iter().rev().find_map(|update| match update {
            SymbolicStateUpdate::Memory(MemoryUpdate::Local { id: bound, value }) if bound == id => {
                Some(value.clone())
            }
            _ => None,
        });
        pending.or_else(|| self.state.memory().local(id).cloned())
    }

    /// Allocate a non-null object of exactly `ty` at the next unused address
    pub fn create_new_object(&mut self, ty: &Type) -> SymbolicValue {
        let addr = self.next_address;
        self.next_address += 1;
        self.updates.push(SymbolicStateUpdate::Allocate {
            next_address: self.next_address,
        });

        let addr = Expr::bv(addr as i64, ADDRESS_WIDTH);
        let constraint = self.context.types_mut().type_constraint(&addr, ty);
        self.assert(constraint);
        trace!("Allocated {} at {}", ty, addr);
        SymbolicValue::reference(ty.clone(), addr)
    }

    /// Value of a literal
    ///
    /// String and class literals are fresh non-null objects of their type;
    /// their contents are not modeled.
    pub fn create_constant(&mut self, constant: &Constant) -> SymbolicValue {
        match constant {
            Constant::Int(v) => SymbolicValue::primitive(Type::Int, Expr::bv(*v as i64, 32)),
            Constant::Long(v) => SymbolicValue::primitive(Type::Long, Expr::bv(*v, 64)),
            Constant::Float(v) => SymbolicValue::primitive(Type::Float, Expr::f32(*v)),
            Constant::Double(v) => SymbolicValue::primitive(Type::Double, Expr::f64(*v)),
            Constant::Null => SymbolicValue::null(),
            Constant::String(_) | Constant::Class(_) => {
                let ty = constant.ty();
                let addr = Expr::var(&self.context.fresh_unbounded_name(), address_sort());
                let constraint = self.context.types_mut().type_constraint(&addr, &ty);
                self.assert(constraint);
                SymbolicValue::reference(ty, addr)
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Heap
    // ───────────────────────────────────────────────────────────────────

    pub fn select_from_field(&self, base: &SymbolicValue, field: &FieldRef) -> Result<SymbolicValue> {
        let base = expect_reference(base, field)?;
        Ok(self.select_at(&base.addr, field))
    }

    pub fn put_into_field(
        &mut self,
        base: &SymbolicValue,
        field: &FieldRef,
        value: &SymbolicValue,
    ) -> Result<()> {
        let base = expect_reference(base, field)?.addr.clone();
        self.store_at(base, field, value)
    }

    /// Static fields live in the field's array at the null address
    pub fn select_static(&self, field: &FieldRef) -> SymbolicValue {
        self.select_at(&null_address(), field)
    }

    pub fn put_static(&mut self, field: &FieldRef, value: &SymbolicValue) -> Result<()> {
        self.store_at(null_address(), field, value)
    }

    fn select_at(&self, addr: &Expr, field: &FieldRef) -> SymbolicValue {
        let chunk = ChunkDescriptor::new(field);
        let array = self.state.memory().field_array(&chunk);
        SymbolicValue::wrap(field.ty.clone(), array.select(addr))
    }

    fn store_at(&mut self, addr: Expr, field: &FieldRef, value: &SymbolicValue) -> Result<()> {
        let stored = self.coerce(value, &field.ty)?;
        self.updates
            .push(SymbolicStateUpdate::Memory(MemoryUpdate::ArrayStore {
                chunk: ChunkDescriptor::new(field),
                index: addr,
                value: stored,
            }));
        Ok(())
    }

    /// Expression of `value` in the sort of `ty`
    fn coerce(&self, value: &SymbolicValue, ty: &Type) -> Result<Expr> {
        match value {
            SymbolicValue::Primitive(p) if ty.is_primitive() => cast_primitive(&p.expr, &p.ty, ty),
            SymbolicValue::Reference(r) if ty.is_reference() => Ok(r.addr.clone()),
            other => Err(SymexError::sort_mismatch(format!(
                "cannot store {} into a location of type {}",
                other, ty
            ))),
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Operations
    // ───────────────────────────────────────────────────────────────────

    /// `lhs op rhs` with result type `ty`
    pub fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &SymbolicValue,
        rhs: &SymbolicValue,
        ty: &Type,
    ) -> Result<SymbolicValue> {
        let expr = match (lhs, rhs) {
            (SymbolicValue::Reference(l), SymbolicValue::Reference(r)) => {
                operators::binary(op, &l.addr, &r.addr)?
            }
            (SymbolicValue::Primitive(l), SymbolicValue::Primitive(r)) => {
                operators::binary(op, &widen_char(l)?, &widen_char(r)?)?
            }
            _ => {
                return Err(SymexError::unsupported(format!(
                    "{:?} between {} and {}",
                    op, lhs, rhs
                )))
            }
        };

        let expected = sort_of(ty);
        let expr = if ty.is_primitive() && expr.sort() != &expected {
            convert(&expr, &expected)?
        } else {
            expr
        };
        Ok(SymbolicValue::primitive(ty.clone(), expr))
    }

    pub fn negate(&self, value: &SymbolicValue) -> Result<SymbolicValue> {
        match value {
            SymbolicValue::Primitive(p) => Ok(SymbolicValue::primitive(
                p.ty.clone(),
                operators::negate(&p.expr)?,
            )),
            SymbolicValue::Reference(_) => Err(SymexError::unsupported(format!(
                "negation of reference {}",
                value
            ))),
        }
    }

    /// Convert `value` to `ty`
    ///
    /// References and primitive/reference mismatches yield a fresh value of
    /// the target type; cast checks are not modeled.
    pub fn cast(&mut self, value: &SymbolicValue, ty: &Type) -> Result<SymbolicValue> {
        if value.ty() == ty {
            return Ok(value.clone());
        }
        match value {
            SymbolicValue::Primitive(p) if ty.is_primitive() => Ok(SymbolicValue::primitive(
                ty.clone(),
                cast_primitive(&p.expr, &p.ty, ty)?,
            )),
            _ => Ok(self.create_const(ty)),
        }
    }

    /// `value` stored into a location declared as `ty`
    ///
    /// Unlike [`cast`](Self::cast), a reference keeps its address and only
    /// takes the declared type.
    pub fn declared_as(&mut self, value: &SymbolicValue, ty: &Type) -> Result<SymbolicValue> {
        match value {
            SymbolicValue::Reference(r) if ty.is_reference() && value.ty() != ty => {
                Ok(SymbolicValue::reference(ty.clone(), r.addr.clone()))
            }
            _ => self.cast(value, ty),
        }
    }

    /// `if condition then lhs else rhs`
    pub fn ite(
        &mut self,
        condition: &Expr,
        lhs: &SymbolicValue,
        rhs: &SymbolicValue,
    ) -> Result<SymbolicValue> {
        match (lhs, rhs) {
            (SymbolicValue::Primitive(l), SymbolicValue::Primitive(r)) => {
                let r_expr = if l.ty == r.ty {
                    r.expr.clone()
                } else {
                    cast_primitive(&r.expr, &r.ty, &l.ty)?
                };
                let expr = ite_expr(condition, &l.expr, &r_expr)?;
                Ok(SymbolicValue::primitive(l.ty.clone(), expr))
            }
            (SymbolicValue::Reference(l), SymbolicValue::Reference(r)) => {
                let ty = if l.ty == Type::Null { &r.ty } else { &l.ty };
                let addr = ite_expr(condition, &l.addr, &r.addr)?;
                Ok(SymbolicValue::reference(ty.clone(), addr))
            }
            _ => Err(SymexError::sort_mismatch(format!(
                "cannot merge {} with {}",
                lhs.ty(),
                rhs.ty()
            ))),
        }
    }
}

/// `if condition then lhs else rhs` over raw expressions of one sort
pub fn ite_expr(condition: &Expr, lhs: &Expr, rhs: &Expr) -> Result<Expr> {
    if lhs.sort() != rhs.sort() {
        return Err(SymexError::sort_mismatch(format!(
            "ite branches of sorts {} and {}",
            lhs.sort(),
            rhs.sort()
        )));
    }
    if condition.sort() != &Sort::Bool {
        return Err(SymexError::sort_mismatch(format!(
            "ite condition of sort {}",
            condition.sort()
        )));
    }
    Ok(condition.ite(lhs, rhs))
}

fn expect_reference<'v>(value: &'v SymbolicValue, field: &FieldRef) -> Result<&'v ReferenceValue> {
    value.as_reference().ok_or_else(|| {
        SymexError::resolution(format!(
            "field {}.{} accessed on non-reference {}",
            field.class, field.name, value
        ))
    })
}

/// `char` operands enter arithmetic as non-negative ints
fn widen_char(value: &PrimitiveValue) -> Result<Expr> {
    if value.ty == Type::Char {
        cast_primitive(&value.expr, &Type::Char, &Type::Int)
    } else {
        Ok(value.expr.clone())
    }
}
