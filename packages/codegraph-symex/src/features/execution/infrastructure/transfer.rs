//! Instruction transfer
//!
//! Maps one instruction to a [`TransferUpdate`]. Straight-line effects
//! (assignments, field stores, fresh values) are buffered in the SVM as a side
//! effect; the returned update says how control moves on.
//!
//! | Instruction                  | Update                 |
//! |------------------------------|------------------------|
//! | assign (no call)             | NoOp                   |
//! | assign of call, invoke       | MethodCall             |
//! | identity                     | ParameterDeclaration   |
//! | if                           | Conditional            |
//! | switch                       | Switch                 |
//! | return, return void          | Return                 |
//! | throw, goto, nop, monitor    | NoOp                   |

use super::resolver::{LValue, ValueResolver};
use crate::errors::{Result, SymexError};
use crate::features::execution::domain::{SwitchTarget, TransferUpdate};
use crate::features::smt::Expr;
use crate::features::symbolic::{SymbolicValue, SymbolicVirtualMachine};
use crate::shared::models::{
    BinaryOp, InstrId, Instruction, InvokeExpr, MethodRef, Place, Rvalue, SwitchTable, Type,
};

/// Transfer `instruction` of `method`
pub fn transfer(
    svm: &mut SymbolicVirtualMachine<'_>,
    method: &MethodRef,
    instruction: &Instruction,
) -> Result<TransferUpdate> {
    let mut resolver = ValueResolver::new(svm, method);
    match instruction {
        Instruction::Assign {
            place,
            value: Rvalue::Invoke { invoke },
        } => {
            let Place::Local { local } = place else {
                return Err(SymexError::resolution(format!(
                    "result of {} must be assigned to a local",
                    invoke.method
                )));
            };
            let arguments = collect_arguments(&mut resolver, invoke)?;
            Ok(TransferUpdate::MethodCall {
                callee: invoke.method.clone(),
                arguments,
                local_to_update: Some(resolver.local_id(local)),
            })
        }
        Instruction::Assign { place, value } => {
            let target = resolver.resolve_place(place)?;
            let value = resolver.resolve_rvalue(value)?;
            resolver.assign(&target, &value)?;
            Ok(TransferUpdate::NoOp)
        }
        Instruction::Identity { local, .. } => {
            let id = resolver.local_id(local);
            if resolver.lookup_local(local).is_none() {
                resolver.svm().create_local(&id);
            }
            Ok(TransferUpdate::ParameterDeclaration(id))
        }
        Instruction::If { condition, target } => {
            let value = resolver.resolve_rvalue(condition)?;
            let on_true = value.as_condition()?;
            let on_false = on_true.not();
            Ok(TransferUpdate::Conditional {
                on_true,
                on_false,
                target: *target,
            })
        }
        Instruction::Switch {
            key,
            table,
            default,
        } => {
            let key = resolver.resolve_immediate(key)?;
            let targets = switch_targets(resolver.svm(), &key, table, *default)?;
            Ok(TransferUpdate::Switch(targets))
        }
        Instruction::Invoke { invoke } => {
            let arguments = collect_arguments(&mut resolver, invoke)?;
            Ok(TransferUpdate::MethodCall {
                callee: invoke.method.clone(),
                arguments,
                local_to_update: None,
            })
        }
        Instruction::Return { value } => {
            Ok(TransferUpdate::Return(resolver.resolve_immediate(value)?))
        }
        Instruction::ReturnVoid => Ok(TransferUpdate::Return(SymbolicValue::void())),
        Instruction::Throw { .. }
        | Instruction::Goto { .. }
        | Instruction::Nop
        | Instruction::Monitor { .. } => Ok(TransferUpdate::NoOp),
    }
}

/// Receiver first (when the call has one), then the arguments
fn collect_arguments(
    resolver: &mut ValueResolver<'_, '_>,
    invoke: &InvokeExpr,
) -> Result<Vec<SymbolicValue>> {
    let mut values = Vec::with_capacity(invoke.args.len() + 1);
    if invoke.kind.has_receiver() {
        let base = invoke.base.as_ref().ok_or_else(|| {
            SymexError::resolution(format!(
                "{:?} call to {} without a receiver",
                invoke.kind, invoke.method
            ))
        })?;
        values.push(resolver.resolve_local(base)?);
    }
    for arg in &invoke.args {
        values.push(resolver.resolve_immediate(arg)?);
    }
    Ok(values)
}

fn equals_case(
    svm: &mut SymbolicVirtualMachine<'_>,
    key: &SymbolicValue,
    case: i32,
) -> Result<Expr> {
    svm.binary(BinaryOp::Eq, key, &SymbolicValue::int(case), &Type::Boolean)?
        .as_condition()
}

fn switch_targets(
    svm: &mut SymbolicVirtualMachine<'_>,
    key: &SymbolicValue,
    table: &SwitchTable,
    default: InstrId,
) -> Result<Vec<SwitchTarget>> {
    let mut targets = Vec::with_capacity(table.targets().len() + 1);
    let default_constraint = match table {
        SwitchTable::Table { low, high, targets: cases } => {
            let expected = (*high as i64) - (*low as i64) + 1;
            if expected != cases.len() as i64 {
                return Err(SymexError::resolution(format!(
                    "table switch {}..={} has {} targets",
                    low,
                    high,
                    cases.len()
                )));
            }
            for (value, target) in (*low..=*high).zip(cases) {
                targets.push(SwitchTarget {
                    constraint: equals_case(svm, key, value)?,
                    target: *target,
                });
            }
            let below = svm
                .binary(BinaryOp::Lt, key, &SymbolicValue::int(*low), &Type::Boolean)?
                .as_condition()?;
            let above = svm
                .binary(BinaryOp::Gt, key, &SymbolicValue::int(*high), &Type::Boolean)?
                .as_condition()?;
            below.or(&above)
        }
        SwitchTable::Lookup { values, targets: cases } => {
            if values.len() != cases.len() {
                return Err(SymexError::resolution(format!(
                    "lookup switch has {} values and {} targets",
                    values.len(),
                    cases.len()
                )));
            }
            let mut misses = Vec::with_capacity(values.len());
            for (value, target) in values.iter().zip(cases) {
                let hit = equals_case(svm, key, *value)?;
                misses.push(hit.not());
                targets.push(SwitchTarget {
                    constraint: hit,
                    target: *target,
                });
            }
            Expr::and_all(misses)
        }
    };
    targets.push(SwitchTarget {
        constraint: default_constraint,
        target: default,
    });
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::smt::{Model, Value};
    use crate::features::symbolic::{LocalId, SymbolicContext, SymbolicState};
    use crate::shared::models::{Constant, FieldRef, IdentitySource, Immediate, InvokeKind, Local};

    fn method() -> MethodRef {
        MethodRef::new("A", "run", vec![Type::Int], Type::Void)
    }

    fn state_with_x() -> (SymbolicState, LocalId) {
        let id = LocalId::new(&method(), &Local::new("x", Type::Int));
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        svm.create_local(&id);
        let updates = svm.collect_updates();
        (state.apply_all(&updates), id)
    }

    fn eval_at(expr: &Expr, x: i64) -> bool {
        let mut model = Model::new();
        model.insert("local_0", Value::bv(x, 32));
        model.eval(expr).unwrap().as_bool().unwrap()
    }

    #[test]
    fn test_if_produces_complementary_constraints() {
        let (state, _) = state_with_x();
        let mut context = SymbolicContext::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let update = transfer(
            &mut svm,
            &method(),
            &Instruction::If {
                condition: Rvalue::Binary {
                    op: BinaryOp::Gt,
                    lhs: Immediate::local("x", Type::Int),
                    rhs: Immediate::int(0),
                    ty: Type::Boolean,
                },
                target: InstrId(4),
            },
        )
        .unwrap();

        let TransferUpdate::Conditional {
            on_true,
            on_false,
            target,
        } = update
        else {
            panic!("expected a conditional");
        };
        assert_eq!(target, InstrId(4));
        assert!(eval_at(&on_true, 1));
        assert!(!eval_at(&on_false, 1));
        assert!(eval_at(&on_false, 0));
    }

    #[test]
    fn test_table_switch_default_is_out_of_range() {
        let (state, _) = state_with_x();
        let mut context = SymbolicContext::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let update = transfer(
            &mut svm,
            &method(),
            &Instruction::Switch {
                key: Immediate::local("x", Type::Int),
                table: SwitchTable::Table {
                    low: 1,
                    high: 2,
                    targets: vec![InstrId(5), InstrId(6)],
                },
                default: InstrId(7),
            },
        )
        .unwrap();

        let TransferUpdate::Switch(targets) = update else {
            panic!("expected a switch");
        };
        assert_eq!(targets.len(), 3);
        assert!(eval_at(&targets[0].constraint, 1));
        assert!(eval_at(&targets[1].constraint, 2));
        let default = &targets[2];
        assert_eq!(default.target, InstrId(7));
        assert!(eval_at(&default.constraint, 0));
        assert!(eval_at(&default.constraint, 3));
        assert!(!eval_at(&default.constraint, 2));
    }

    #[test]
    fn test_lookup_switch_default_misses_every_case() {
        let (state, _) = state_with_x();
        let mut context = SymbolicContext::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let update = transfer(
            &mut svm,
            &method(),
            &Instruction::Switch {
                key: Immediate::local("x", Type::Int),
                table: SwitchTable::Lookup {
                    values: vec![10, 20],
                    targets: vec![InstrId(5), InstrId(6)],
                },
                default: InstrId(7),
            },
        )
        .unwrap();

        let TransferUpdate::Switch(targets) = update else {
            panic!("expected a switch");
        };
        let default = &targets[2].constraint;
        assert!(eval_at(default, 15));
        assert!(!eval_at(default, 20));
        assert!(eval_at(&targets[1].constraint, 20));
    }

    #[test]
    fn test_identity_binds_fresh_value_once() {
        let (state, id) = state_with_x();
        let mut context = SymbolicContext::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let update = transfer(
            &mut svm,
            &method(),
            &Instruction::Identity {
                local: Local::new("x", Type::Int),
                source: IdentitySource::Parameter(0),
            },
        )
        .unwrap();
        assert_eq!(update, TransferUpdate::ParameterDeclaration(id));
        // already bound by the caller: nothing new
        assert!(svm.collect_updates().is_empty());

        let update = transfer(
            &mut svm,
            &method(),
            &Instruction::Identity {
                local: Local::new("y", Type::Int),
                source: IdentitySource::Parameter(1),
            },
        )
        .unwrap();
        assert!(matches!(update, TransferUpdate::ParameterDeclaration(_)));
        assert_eq!(svm.collect_updates().len(), 1);
    }

    #[test]
    fn test_call_arguments_start_with_receiver() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let this = LocalId::new(&method(), &Local::new("this", Type::class("A")));
        svm.update_local(&this, SymbolicValue::null());

        let callee = MethodRef::new("A", "f", vec![Type::Int], Type::Int);
        let update = transfer(
            &mut svm,
            &method(),
            &Instruction::Assign {
                place: Place::Local {
                    local: Local::new("r", Type::Int),
                },
                value: Rvalue::Invoke {
                    invoke: InvokeExpr {
                        kind: InvokeKind::Virtual,
                        method: callee.clone(),
                        base: Some(Local::new("this", Type::class("A"))),
                        args: vec![Immediate::int(4)],
                    },
                },
            },
        )
        .unwrap();

        let TransferUpdate::MethodCall {
            callee: called,
            arguments,
            local_to_update,
        } = update
        else {
            panic!("expected a call");
        };
        assert_eq!(called, callee);
        assert_eq!(arguments.len(), 2);
        assert!(arguments[0].is_reference());
        assert_eq!(arguments[1], SymbolicValue::int(4));
        assert_eq!(local_to_update.map(|id| id.name.to_string()), Some("r".to_string()));
    }

    #[test]
    fn test_control_only_instructions_are_no_ops() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        for instruction in [
            Instruction::Nop,
            Instruction::Goto { target: InstrId(0) },
            Instruction::Throw {
                value: Immediate::Constant(Constant::Null),
            },
        ] {
            assert_eq!(
                transfer(&mut svm, &method(), &instruction).unwrap(),
                TransferUpdate::NoOp
            );
        }
        assert_eq!(
            transfer(&mut svm, &method(), &Instruction::ReturnVoid).unwrap(),
            TransferUpdate::Return(SymbolicValue::void())
        );
    }

    #[test]
    fn test_call_result_into_field_is_rejected() {
        let mut context = SymbolicContext::new();
        let state = SymbolicState::new();
        let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
        let result = transfer(
            &mut svm,
            &method(),
            &Instruction::Assign {
                place: Place::StaticField {
                    field: FieldRef::static_field("A", "s", Type::Int),
                },
                value: Rvalue::Invoke {
                    invoke: InvokeExpr {
                        kind: InvokeKind::Static,
                        method: MethodRef::new("A", "g", vec![], Type::Int),
                        base: None,
                        args: vec![],
                    },
                },
            },
        );
        assert!(result.is_err());
    }
}
