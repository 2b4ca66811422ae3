//! Symbolic values
//!
//! A value is either a primitive carrying an expression of the sort matching
//! its type, or a reference carrying a 32-bit address expression. Address 0 is
//! `null`.

use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, SymexError};
use crate::features::smt::{Expr, FloatSort, Sort};
use crate::shared::models::{Local, MethodRef, Type};

/// Width of heap addresses
pub const ADDRESS_WIDTH: u32 = 32;

/// Address of `null`
pub const NULL_ADDRESS: i64 = 0;

pub fn address_sort() -> Sort {
    Sort::BitVec(ADDRESS_WIDTH)
}

pub fn null_address() -> Expr {
    Expr::bv(NULL_ADDRESS, ADDRESS_WIDTH)
}

/// Solver sort of a declared type
///
/// References, arrays and `null` are addresses. `void` results carry a dummy
/// 32-bit value.
pub fn sort_of(ty: &Type) -> Sort {
    match ty {
        Type::Boolean => Sort::Bool,
        Type::Byte => Sort::BitVec(8),
        Type::Short | Type::Char => Sort::BitVec(16),
        Type::Int => Sort::BitVec(32),
        Type::Long => Sort::BitVec(64),
        Type::Float => Sort::Float(FloatSort::F32),
        Type::Double => Sort::Float(FloatSort::F64),
        Type::Void => Sort::BitVec(32),
        Type::Null | Type::Ref(_) | Type::Array(_) => address_sort(),
    }
}

/// Local variable identity: owning method, name and declared type
///
/// Not scoped by call instance, so recursive activations of one method share
/// their locals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId {
    pub method: MethodRef,
    pub name: Arc<str>,
    pub ty: Type,
}

impl LocalId {
    pub fn new(method: &MethodRef, local: &Local) -> Self {
        Self {
            method: method.clone(),
            name: Arc::from(local.name.as_str()),
            ty: local.ty.clone(),
        }
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}: {}", self.method.qualified_name(), self.name, self.ty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveValue {
    pub ty: Type,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Object,
    Array,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceValue {
    pub ty: Type,
    pub addr: Expr,
}

impl ReferenceValue {
    pub fn kind(&self) -> ReferenceKind {
        match self.ty {
            Type::Array(_) => ReferenceKind::Array,
            Type::Null => ReferenceKind::Null,
            _ => ReferenceKind::Object,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicValue {
    Primitive(PrimitiveValue),
    Reference(ReferenceValue),
}

impl SymbolicValue {
    pub fn primitive(ty: Type, expr: Expr) -> Self {
        SymbolicValue::Primitive(PrimitiveValue { ty, expr })
    }

    pub fn reference(ty: Type, addr: Expr) -> Self {
        SymbolicValue::Reference(ReferenceValue { ty, addr })
    }

    /// Value of type `ty` around `expr`, reference or primitive by type
    pub fn wrap(ty: Type, expr: Expr) -> Self {
        if ty.is_reference() {
            Self::reference(ty, expr)
        } else {
            Self::primitive(ty, expr)
        }
    }

    pub fn null() -> Self {
        Self::reference(Type::Null, null_address())
    }

    pub fn void() -> Self {
        Self::primitive(Type::Void, Expr::bv(0, 32))
    }

    pub fn bool(value: bool) -> Self {
        Self::primitive(Type::Boolean, Expr::bool(value))
    }

    pub fn int(value: i32) -> Self {
        Self::primitive(Type::Int, Expr::bv(value as i64, 32))
    }

    pub fn ty(&self) -> &Type {
        match self {
            SymbolicValue::Primitive(p) => &p.ty,
            SymbolicValue::Reference(r) => &r.ty,
        }
    }

    /// Underlying expression, the address for references
    pub fn expr(&self) -> &Expr {
        match self {
            SymbolicValue::Primitive(p) => &p.expr,
            SymbolicValue::Reference(r) => &r.addr,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, SymbolicValue::Reference(_))
    }

    pub fn as_reference(&self) -> Option<&ReferenceValue> {
        match self {
            SymbolicValue::Reference(r) => Some(r),
            SymbolicValue::Primitive(_) => None,
        }
    }

    /// Boolean expression of a condition value
    pub fn as_condition(&self) -> Result<Expr> {
        match self {
            SymbolicValue::Primitive(p) if p.expr.sort().is_bool() => Ok(p.expr.clone()),
            other => Err(SymexError::sort_mismatch(format!(
                "expected a boolean condition, got {} of type {}",
                other.expr(),
                other.ty()
            ))),
        }
    }
}

impl fmt::Display for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicValue::Primitive(p) => write!(f, "{}: {}", p.expr, p.ty),
            SymbolicValue::Reference(r) => write!(f, "@{}: {}", r.addr, r.ty),
        }
    }
}
