//! Value resolution
//!
//! Turns operands, right-hand sides and assignable places of one method into
//! symbolic values and writes, through the SVM.
//!
//! Array elements, `new T[n]`, `length` and `instanceof` are not modeled:
//! they read as fresh values of their type, and array stores are dropped.

use crate::errors::{Result, SymexError};
use crate::features::symbolic::{LocalId, SymbolicValue, SymbolicVirtualMachine};
use crate::shared::models::{FieldRef, Immediate, Local, MethodRef, Place, Rvalue, Type};

/// Resolved assignment target
#[derive(Debug, Clone)]
pub enum LValue {
    Local(LocalId),
    InstanceField { base: SymbolicValue, field: FieldRef },
    StaticField(FieldRef),
    ArrayElement,
}

pub struct ValueResolver<'r, 'a> {
    svm: &'r mut SymbolicVirtualMachine<'a>,
    method: &'r MethodRef,
}

impl<'r, 'a> ValueResolver<'r, 'a> {
    pub fn new(svm: &'r mut SymbolicVirtualMachine<'a>, method: &'r MethodRef) -> Self {
        Self { svm, method }
    }

    pub fn svm(&mut self) -> &mut SymbolicVirtualMachine<'a> {
        self.svm
    }

    pub fn local_id(&self, local: &Local) -> LocalId {
        LocalId::new(self.method, local)
    }

    /// Current value of a local, `None` when unbound
    pub fn lookup_local(&self, local: &Local) -> Option<SymbolicValue> {
        self.svm.local(&self.local_id(local))
    }

    pub fn resolve_local(&self, local: &Local) -> Result<SymbolicValue> {
        self.lookup_local(local).ok_or_else(|| {
            SymexError::resolution(format!(
                "{} is not found in the locals of {}",
                local.name, self.method
            ))
        })
    }

    pub fn resolve_immediate(&mut self, value: &Immediate) -> Result<SymbolicValue> {
        match value {
            Immediate::Local(local) => self.resolve_local(local),
            Immediate::Constant(constant) => Ok(self.svm.create_constant(constant)),
        }
    }

    pub fn resolve_rvalue(&mut self, rvalue: &Rvalue) -> Result<SymbolicValue> {
        match rvalue {
            Rvalue::Use { value } => self.resolve_immediate(value),
            Rvalue::Binary { op, lhs, rhs, ty } => {
                let lhs = self.resolve_immediate(lhs)?;
                let rhs = self.resolve_immediate(rhs)?;
                self.svm.binary(*op, &lhs, &rhs, ty)
            }
            Rvalue::Neg { value } => {
                let value = self.resolve_immediate(value)?;
                self.svm.negate(&value)
            }
            Rvalue::Cast { value, to } => {
                let value = self.resolve_immediate(value)?;
                self.svm.cast(&value, to)
            }
            Rvalue::InstanceOf { .. } => Ok(self.svm.create_const(&Type::Boolean)),
            Rvalue::New { ty } => Ok(self.svm.create_new_object(ty)),
            Rvalue::NewArray { element, .. } => {
                Ok(self.svm.create_const(&Type::array_of(element.clone())))
            }
            Rvalue::Length { .. } => Ok(self.svm.create_const(&Type::Int)),
            Rvalue::InstanceField { base, field } => {
                let base = self.resolve_local(base)?;
                self.svm.select_from_field(&base, field)
            }
            Rvalue::StaticField { field } => Ok(self.svm.select_static(field)),
            Rvalue::ArrayElement { ty, .. } => Ok(self.svm.create_const(ty)),
            Rvalue::Invoke { invoke } => Err(SymexError::unsupported(format!(
                "call to {} outside an assignment",
                invoke.method
            ))),
        }
    }

    pub fn resolve_place(&mut self, place: &Place) -> Result<LValue> {
        match place {
            Place::Local { local } => Ok(LValue::Local(self.local_id(local))),
            Place::InstanceField { base, field } => Ok(LValue::InstanceField {
                base: self.resolve_local(base)?,
                field: field.clone(),
            }),
            Place::StaticField { field } => Ok(LValue::StaticField(field.clone())),
            Place::ArrayElement { .. } => Ok(LValue::ArrayElement),
        }
    }

    /// Write `value` into `target`
    pub fn assign(&mut self, target: &LValue, value: &SymbolicValue) -> Result<()> {
        match target {
            LValue::Local(id) => {
                let value = self.svm.declared_as(value, &id.ty)?;
                self.svm.update_local(id, value);
                Ok(())
            }
            LValue::InstanceField { base, field } => self.svm.put_into_field(base, field, value),
            LValue::StaticField(field) => self.svm.put_static(field, value),
            LValue::ArrayElement => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::symbolic::{SymbolicContext, SymbolicState, SymbolicStateUpdate};
    use crate::shared::models::{BinaryOp, Constant};

    fn method() -> MethodRef {
        MethodRef::new("A", "run", vec![], Type::Void)
    }

    #[test]
    fn test_unbound_local_is_an_error() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let method = method();
        let mut resolver = ValueResolver::new(&mut svm, &method);
        assert!(resolver
            .resolve_immediate(&Immediate::local("x", Type::Int))
            .is_err());
    }

    #[test]
    fn test_assign_then_read_local() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let method = method();
        let mut resolver = ValueResolver::new(&mut svm, &method);

        let target = resolver
            .resolve_place(&Place::Local {
                local: Local::new("x", Type::Int),
            })
            .unwrap();
        let five = resolver
            .resolve_rvalue(&Rvalue::Binary {
                op: BinaryOp::Add,
                lhs: Immediate::int(2),
                rhs: Immediate::int(3),
                ty: Type::Int,
            })
            .unwrap();
        resolver.assign(&target, &five).unwrap();

        let read = resolver
            .resolve_immediate(&Immediate::local("x", Type::Int))
            .unwrap();
        assert_eq!(read.expr().as_bv(), Some(5));
    }

    #[test]
    fn test_unmodeled_values_are_fresh() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let method = method();
        let mut resolver = ValueResolver::new(&mut svm, &method);

        let length = resolver
            .resolve_rvalue(&Rvalue::Length {
                array: Immediate::Constant(Constant::Null),
            })
            .unwrap();
        assert!(length.expr().var_name().is_some());

        let array = resolver
            .resolve_rvalue(&Rvalue::NewArray {
                element: Type::Int,
                size: Immediate::int(3),
            })
            .unwrap();
        assert_eq!(array.ty(), &Type::array_of(Type::Int));

        // array stores leave no trace
        resolver.assign(&LValue::ArrayElement, &length).unwrap();
        let updates = svm.collect_updates();
        assert!(updates
            .iter()
            .all(|u| matches!(u, SymbolicStateUpdate::Constraint(_))));
    }

    #[test]
    fn test_field_on_null_base_is_rejected_for_primitives() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let method = method();
        let mut resolver = ValueResolver::new(&mut svm, &method);

        let field = FieldRef::instance("A", "f", Type::Int);
        let target = LValue::InstanceField {
            base: SymbolicValue::int(0),
            field,
        };
        assert!(resolver.assign(&target, &SymbolicValue::int(1)).is_err());
    }
}
