//! Traverser: one execution step
//!
//! Executes the instruction at the top node of a state and returns the
//! successor states, one per graph edge that is taken.
//!
//! ```text
//! state ─► transfer(instr) ─► TransferUpdate + buffered SVM updates
//!                                   │
//!        ┌──────────────┬───────────┼──────────────┬──────────────┐
//!        ▼              ▼           ▼              ▼              ▼
//!      NoOp       Conditional    Switch       MethodCall       Return
//!   every succ   on_true/false  per-case   enter or mock   pop or resume
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::mocking::MockingPolicy;
use super::transfer::transfer;
use crate::errors::{Result, SymexError};
use crate::features::execution::domain::{
    ExecutionState, Parameter, StackElement, SwitchTarget, TransferUpdate,
};
use crate::features::interprocedural::{InterproceduralGraph, Node};
use crate::features::smt::Expr;
use crate::features::symbolic::{
    LocalId, SymbolicContext, SymbolicState, SymbolicStateUpdate, SymbolicValue,
    SymbolicVirtualMachine,
};
use crate::shared::models::{InstrId, Instruction, MethodBody, MethodRef};
use crate::shared::ports::ProgramModel;

pub struct Traverser<'t, 'g> {
    graph: &'t mut InterproceduralGraph<'g, ExecutionState>,
    context: &'t mut SymbolicContext,
    mocking: MockingPolicy,
}

impl<'t, 'g> Traverser<'t, 'g> {
    pub fn new(
        graph: &'t mut InterproceduralGraph<'g, ExecutionState>,
        context: &'t mut SymbolicContext,
        mocking: MockingPolicy,
    ) -> Self {
        Self {
            graph,
            context,
            mocking,
        }
    }

    /// Successor states of `state`
    pub fn traverse(&mut self, state: &ExecutionState) -> Result<Vec<ExecutionState>> {
        let node = state.top_node().clone();
        let body = body_of(self.graph.program(), &node.method)?;
        let instruction = body.instruction(node.instr).ok_or_else(|| {
            SymexError::graph(format!("{} has no instruction {}", node.method, node.instr))
        })?;

        let Self {
            graph,
            context,
            mocking,
        } = self;
        let mut svm = SymbolicVirtualMachine::new(context, state.symbolic_state());
        let update = transfer(&mut svm, &node.method, instruction)?;
        let updates = svm.collect_updates();
        trace!("{} -> {} ({} updates)", node, update.name(), updates.len());

        let step = Step {
            state,
            node: &node,
            updates,
        };
        match update {
            TransferUpdate::NoOp => step.no_op(graph),
            TransferUpdate::ParameterDeclaration(id) => step.parameter_declaration(graph, id),
            TransferUpdate::Conditional {
                on_true,
                on_false,
                target,
            } => step.conditional(graph, &body, on_true, on_false, target),
            TransferUpdate::Switch(targets) => step.switch(graph, targets),
            TransferUpdate::MethodCall {
                callee,
                arguments,
                local_to_update,
            } => {
                let call = Call {
                    callee,
                    arguments,
                    local_to_update,
                };
                if let Some(reason) = mocking.reason(state, graph.program(), &call.callee) {
                    debug!("Mocking call to {} at {}: {}", call.callee, node, reason);
                    step.mocked_call(graph, &mut svm, call)
                } else {
                    step.entered_call(graph, &mut svm, call)
                }
            }
            TransferUpdate::Return(value) => {
                if state.stack().len() > 1 {
                    step.balanced_return(graph, &mut svm, value)
                } else {
                    step.unbalanced_return(graph, &mut svm)
                }
            }
        }
    }
}

fn body_of(program: &dyn ProgramModel, method: &MethodRef) -> Result<Arc<MethodBody>> {
    program
        .body(method)
        .ok_or_else(|| SymexError::graph(format!("no body for {}", method)))
}

struct Call {
    callee: MethodRef,
    arguments: Vec<SymbolicValue>,
    local_to_update: Option<LocalId>,
}

/// The state being stepped, its node and the instruction's buffered updates
struct Step<'s> {
    state: &'s ExecutionState,
    node: &'s Node,
    updates: Vec<SymbolicStateUpdate>,
}

type Graph<'g> = InterproceduralGraph<'g, ExecutionState>;

impl Step<'_> {
    fn updated(&self) -> SymbolicState {
        self.state.symbolic_state().apply_all(&self.updates)
    }

    /// Advance to the first successor, no state when there is none
    fn to_first_successor(
        &self,
        graph: &Graph<'_>,
        state: &ExecutionState,
        symbolic: SymbolicState,
    ) -> Result<Vec<ExecutionState>> {
        Ok(graph
            .first_successor(self.node)?
            .map(|next| state.advance(next, symbolic))
            .into_iter()
            .collect())
    }

    fn no_op(self, graph: &Graph<'_>) -> Result<Vec<ExecutionState>> {
        let symbolic = self.updated();
        Ok(graph
            .successors(self.node)?
            .into_iter()
            .map(|next| self.state.advance(next, symbolic.clone()))
            .collect())
    }

    fn parameter_declaration(self, graph: &Graph<'_>, id: LocalId) -> Result<Vec<ExecutionState>> {
        let symbolic = self.updated();
        let value = symbolic.memory().local(&id).cloned().ok_or_else(|| {
            SymexError::resolution(format!("parameter {} is not bound", id))
        })?;
        let frame = self.state.top_frame().with_parameter(Parameter { id, value });
        let state = self.state.with_top_frame(frame);
        self.to_first_successor(graph, &state, symbolic)
    }

    fn conditional(
        self,
        graph: &Graph<'_>,
        body: &MethodBody,
        on_true: Expr,
        on_false: Expr,
        target: InstrId,
    ) -> Result<Vec<ExecutionState>> {
        // branch and fall-through on the same instruction: the condition is moot
        if body.successors(self.node.instr) == [target] {
            return self.no_op(graph);
        }
        let symbolic = self.updated();
        Ok(graph
            .successors(self.node)?
            .into_iter()
            .map(|next| {
                let constraint = if next.instr == target {
                    on_true.clone()
                } else {
                    on_false.clone()
                };
                let symbolic = symbolic.update(&SymbolicStateUpdate::Constraint(constraint));
                self.state.advance(next, symbolic)
            })
            .collect())
    }

    fn switch(self, graph: &Graph<'_>, targets: Vec<SwitchTarget>) -> Result<Vec<ExecutionState>> {
        let mut by_target: BTreeMap<InstrId, Vec<Expr>> = BTreeMap::new();
        for SwitchTarget { constraint, target } in targets {
            by_target.entry(target).or_default().push(constraint);
        }

        let symbolic = self.updated();
        graph
            .successors(self.node)?
            .into_iter()
            .map(|next| {
                let cases = by_target.get(&next.instr).ok_or_else(|| {
                    SymexError::resolution(format!(
                        "switch at {} has no case for successor {}",
                        self.node, next.instr
                    ))
                })?;
                let constraint = Expr::or_all(cases.iter().cloned());
                let symbolic = symbolic.update(&SymbolicStateUpdate::Constraint(constraint));
                Ok(self.state.advance(next, symbolic))
            })
            .collect()
    }

    fn mocked_call(
        mut self,
        graph: &Graph<'_>,
        svm: &mut SymbolicVirtualMachine<'_>,
        call: Call,
    ) -> Result<Vec<ExecutionState>> {
        if let Some(id) = &call.local_to_update {
            let value = svm.create_const(&id.ty);
            svm.update_local(id, value);
            self.updates.extend(svm.collect_updates());
        }
        let symbolic = self.updated();
        self.to_first_successor(graph, self.state, symbolic)
    }

    fn entered_call(
        self,
        graph: &mut Graph<'_>,
        svm: &mut SymbolicVirtualMachine<'_>,
        call: Call,
    ) -> Result<Vec<ExecutionState>> {
        let Call {
            callee,
            arguments,
            local_to_update,
        } = call;
        let entry = graph.new_method_call(&callee)?;
        let body = body_of(graph.program(), &callee)?;

        let mut arguments = arguments.into_iter();
        let mut bindings = Vec::new();
        for instruction in &body.instructions {
            if let Instruction::Identity { local, .. } = instruction {
                let id = LocalId::new(&callee, local);
                let value = match arguments.next() {
                    Some(argument) => svm.declared_as(&argument, &id.ty)?,
                    None => svm.create_const(&id.ty),
                };
                bindings.push((id, value));
            }
        }

        let symbolic = self.updated();
        let symbolic = symbolic
            .with_memory(symbolic.memory().with_locals(bindings))
            .apply_all(&svm.collect_updates());
        let frame = StackElement::call(self.node.clone(), local_to_update);
        debug!("Entering {} from {}", callee, self.node);
        Ok(vec![self
            .state
            .with_call(frame, &callee)
            .advance(entry, symbolic)])
    }

    fn balanced_return(
        self,
        graph: &Graph<'_>,
        svm: &mut SymbolicVirtualMachine<'_>,
        value: SymbolicValue,
    ) -> Result<Vec<ExecutionState>> {
        let frame = self.state.top_frame();
        let caller = frame.caller.as_ref().ok_or_else(|| {
            SymexError::MissingState(format!("frame of {} has no call site", self.node.method))
        })?;
        let Some(next) = graph.first_successor(caller)? else {
            return Ok(Vec::new());
        };

        let memory = self
            .state
            .symbolic_state()
            .memory()
            .without_locals_of(&self.node.method);
        let mut symbolic = self
            .state
            .symbolic_state()
            .with_memory(memory)
            .apply_all(&self.updates);
        if let Some(id) = &frame.local_to_update {
            let value = svm.declared_as(&value, &id.ty)?;
            svm.update_local(id, value);
            symbolic = symbolic.apply_all(&svm.collect_updates());
        }
        trace!("Returning from {} to {}", self.node.method, next);
        Ok(vec![self.state.with_frame_popped().advance(next, symbolic)])
    }

    fn unbalanced_return(
        self,
        graph: &mut Graph<'_>,
        svm: &mut SymbolicVirtualMachine<'_>,
    ) -> Result<Vec<ExecutionState>> {
        let resumed = graph.unbalanced_return(self.node)?;
        let caller_body = body_of(graph.program(), &resumed.method)?;

        let fresh: Vec<_> = caller_body
            .locals
            .iter()
            .map(|local| {
                let id = LocalId::new(&resumed.method, local);
                let value = svm.create_const(&id.ty);
                (id, value)
            })
            .collect();

        let symbolic = self.updated();
        let memory = symbolic
            .memory()
            .without_locals_of(&self.node.method)
            .with_locals(fresh);
        let symbolic = symbolic
            .with_memory(memory)
            .apply_all(&svm.collect_updates());
        debug!("Unbalanced return from {} into {}", self.node, resumed);
        Ok(vec![self.state.with_root_stack().advance(resumed, symbolic)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::interprocedural::{TaintPath, TaintPathEntry};
    use crate::features::smt::{Model, Value};
    use crate::shared::models::{
        BinaryOp, Constant, IdentitySource, Immediate, InvokeExpr, InvokeKind, Local, Place,
        Rvalue, SwitchTable, Type,
    };
    use crate::shared::ports::Program;

    fn method(name: &str) -> MethodRef {
        MethodRef::new("A", name, vec![Type::Int], Type::Int)
    }

    fn x() -> Local {
        Local::new("x", Type::Int)
    }

    fn identity(local: Local, index: usize) -> Instruction {
        Instruction::Identity {
            local,
            source: IdentitySource::Parameter(index),
        }
    }

    fn assign_const(local: Local, value: i32) -> Instruction {
        Instruction::Assign {
            place: Place::Local { local },
            value: Rvalue::Use {
                value: Immediate::int(value),
            },
        }
    }

    /// Sink outside the fixture's methods, so their graphs stay unpruned
    fn elsewhere() -> TaintPath {
        TaintPath::new(vec![TaintPathEntry::sink(method("elsewhere"), InstrId(0))]).unwrap()
    }

    struct Fixture {
        program: Program,
        taint_path: TaintPath,
    }

    impl Fixture {
        fn new(bodies: Vec<MethodBody>, taint_path: TaintPath) -> Self {
            let mut program = Program::new();
            for body in bodies {
                program.add_method(body);
            }
            Self {
                program,
                taint_path,
            }
        }

        fn run<F>(&self, f: F)
        where
            F: FnOnce(&mut Graph<'_>, &mut SymbolicContext),
        {
            let mut graph = InterproceduralGraph::new(&self.program, &self.taint_path);
            let mut context = SymbolicContext::new();
            f(&mut graph, &mut context);
        }
    }

    fn step(
        graph: &mut Graph<'_>,
        context: &mut SymbolicContext,
        state: &ExecutionState,
    ) -> Vec<ExecutionState> {
        Traverser::new(graph, context, MockingPolicy::new(4))
            .traverse(state)
            .unwrap()
    }

    fn only(mut states: Vec<ExecutionState>) -> ExecutionState {
        assert_eq!(states.len(), 1);
        states.remove(0)
    }

    #[test]
    fn test_branch_constrains_each_edge() {
        let body = MethodBody::new(
            method("main"),
            vec![x()],
            vec![
                identity(x(), 0),
                Instruction::If {
                    condition: Rvalue::Binary {
                        op: BinaryOp::Gt,
                        lhs: Immediate::local("x", Type::Int),
                        rhs: Immediate::int(0),
                        ty: Type::Boolean,
                    },
                    target: InstrId(3),
                },
                Instruction::ReturnVoid,
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();
        let fixture = Fixture::new(vec![body], elsewhere());
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("main")).unwrap();
            let state = ExecutionState::initial(entry);
            let state = only(step(graph, context, &state));
            assert_eq!(state.top_instr(), InstrId(1));
            assert_eq!(state.top_frame().parameters.len(), 1);

            let branches = step(graph, context, &state);
            assert_eq!(branches.len(), 2);
            let taken = branches.iter().find(|s| s.top_instr() == InstrId(3)).unwrap();
            let mut model = Model::new();
            model.insert("local_0", Value::bv(1, 32));
            let pc = taken.symbolic_state().path_condition();
            assert_eq!(model.eval(&pc).unwrap().as_bool(), Some(true));
        });
    }

    #[test]
    fn test_switch_cases_sharing_a_target_are_joined() {
        let body = MethodBody::new(
            method("main"),
            vec![x()],
            vec![
                identity(x(), 0),
                Instruction::Switch {
                    key: Immediate::local("x", Type::Int),
                    table: SwitchTable::Lookup {
                        values: vec![1, 2],
                        targets: vec![InstrId(2), InstrId(2)],
                    },
                    default: InstrId(3),
                },
                Instruction::ReturnVoid,
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();
        let fixture = Fixture::new(vec![body], elsewhere());
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("main")).unwrap();
            let state = only(step(graph, context, &ExecutionState::initial(entry)));
            let states = step(graph, context, &state);
            assert_eq!(states.len(), 2);

            let case = states.iter().find(|s| s.top_instr() == InstrId(2)).unwrap();
            let pc = case.symbolic_state().path_condition();
            for (value, expected) in [(1, true), (2, true), (3, false)] {
                let mut model = Model::new();
                model.insert("local_0", Value::bv(value, 32));
                assert_eq!(model.eval(&pc).unwrap().as_bool(), Some(expected));
            }
        });
    }

    #[test]
    fn test_call_enters_callee_and_returns_value() {
        let callee = MethodBody::new(
            method("inc"),
            vec![x()],
            vec![
                identity(x(), 0),
                Instruction::Return {
                    value: Immediate::local("x", Type::Int),
                },
            ],
        )
        .unwrap();
        let r = Local::new("r", Type::Int);
        let main = MethodBody::new(
            method("main"),
            vec![r.clone()],
            vec![
                Instruction::Assign {
                    place: Place::Local { local: r.clone() },
                    value: Rvalue::Invoke {
                        invoke: InvokeExpr {
                            kind: InvokeKind::Static,
                            method: method("inc"),
                            base: None,
                            args: vec![Immediate::int(41)],
                        },
                    },
                },
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();
        let fixture = Fixture::new(vec![main, callee], elsewhere());
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("main")).unwrap();
            let state = ExecutionState::initial(entry);

            let in_callee = only(step(graph, context, &state));
            assert_eq!(in_callee.top_method(), &method("inc"));
            assert_eq!(in_callee.stack().len(), 2);
            assert_eq!(in_callee.call_count(&method("inc")), 1);

            let declared = only(step(graph, context, &in_callee));
            let returned = only(step(graph, context, &declared));
            assert_eq!(returned.top_method(), &method("main"));
            assert_eq!(returned.top_instr(), InstrId(1));
            assert_eq!(returned.stack().len(), 1);

            let memory = returned.symbolic_state().memory();
            let r_id = LocalId::new(&method("main"), &r);
            assert_eq!(memory.local(&r_id), Some(&SymbolicValue::int(41)));
            assert!(memory.local(&LocalId::new(&method("inc"), &x())).is_none());
        });
    }

    #[test]
    fn test_library_call_is_mocked() {
        let r = Local::new("r", Type::Int);
        let main = MethodBody::new(
            method("main"),
            vec![r.clone()],
            vec![
                Instruction::Assign {
                    place: Place::Local { local: r.clone() },
                    value: Rvalue::Invoke {
                        invoke: InvokeExpr {
                            kind: InvokeKind::Static,
                            method: MethodRef::new("lib.L", "f", vec![], Type::Int),
                            base: None,
                            args: vec![],
                        },
                    },
                },
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();
        let mut fixture = Fixture::new(vec![main], elsewhere());
        fixture.program.add_library_class("lib.L");
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("main")).unwrap();
            let next = only(step(graph, context, &ExecutionState::initial(entry)));
            assert_eq!(next.top_instr(), InstrId(1));
            assert_eq!(next.stack().len(), 1);
            let value = next
                .symbolic_state()
                .memory()
                .local(&LocalId::new(&method("main"), &r))
                .cloned()
                .unwrap();
            assert!(value.expr().var_name().is_some());
        });
    }

    #[test]
    fn test_unbalanced_return_resumes_at_call_site() {
        let callee = MethodBody::new(
            method("inner"),
            vec![x()],
            vec![assign_const(x(), 1), Instruction::ReturnVoid],
        )
        .unwrap();
        let y = Local::new("y", Type::Int);
        let caller = MethodBody::new(
            method("outer"),
            vec![y.clone()],
            vec![
                Instruction::Invoke {
                    invoke: InvokeExpr {
                        kind: InvokeKind::Static,
                        method: method("inner"),
                        base: None,
                        args: vec![],
                    },
                },
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();
        let taint_path = TaintPath::new(vec![
            TaintPathEntry::returning(method("inner"), InstrId(1), InstrId(0), method("outer")),
            TaintPathEntry::sink(method("outer"), InstrId(1)),
        ])
        .unwrap();
        let fixture = Fixture::new(vec![callee, caller], taint_path);
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("inner")).unwrap();
            let state = only(step(graph, context, &ExecutionState::initial(entry)));
            let resumed = only(step(graph, context, &state));

            assert_eq!(resumed.top_method(), &method("outer"));
            assert_eq!(resumed.top_instr(), InstrId(0));
            assert_eq!(resumed.stack().len(), 1);
            let memory = resumed.symbolic_state().memory();
            assert!(memory.local(&LocalId::new(&method("inner"), &x())).is_none());
            assert!(memory.local(&LocalId::new(&method("outer"), &y)).is_some());
        });
    }

    #[test]
    fn test_unbalanced_return_off_the_taint_path_fails() {
        let body = MethodBody::new(
            method("main"),
            vec![],
            vec![Instruction::Nop, Instruction::ReturnVoid],
        )
        .unwrap();
        let fixture = Fixture::new(vec![body], elsewhere());
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("main")).unwrap();
            let state = only(step(graph, context, &ExecutionState::initial(entry)));
            let result = Traverser::new(graph, context, MockingPolicy::new(4)).traverse(&state);
            assert!(matches!(result, Err(SymexError::UnbalancedReturn(_))));
        });
    }

    #[test]
    fn test_field_store_then_load() {
        let a = Local::new("a", Type::class("A"));
        let field = crate::shared::models::FieldRef::instance("A", "f", Type::Int);
        let body = MethodBody::new(
            method("main"),
            vec![a.clone(), x()],
            vec![
                Instruction::Assign {
                    place: Place::Local { local: a.clone() },
                    value: Rvalue::New {
                        ty: Type::class("A"),
                    },
                },
                Instruction::Assign {
                    place: Place::InstanceField {
                        base: a.clone(),
                        field: field.clone(),
                    },
                    value: Rvalue::Use {
                        value: Immediate::Constant(Constant::Int(9)),
                    },
                },
                Instruction::Assign {
                    place: Place::Local { local: x() },
                    value: Rvalue::InstanceField {
                        base: a,
                        field,
                    },
                },
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();
        let fixture = Fixture::new(vec![body], elsewhere());
        fixture.run(|graph, context| {
            let entry = graph.new_method_call(&method("main")).unwrap();
            let mut state = ExecutionState::initial(entry);
            for _ in 0..3 {
                state = only(step(graph, context, &state));
            }
            let value = state
                .symbolic_state()
                .memory()
                .local(&LocalId::new(&method("main"), &x()))
                .cloned()
                .unwrap();
            let mut model = Model::new();
            model.insert(
                "1:A.f",
                Value::Array(crate::features::smt::domain::ArrayValue::constant(Value::bv(0, 32))),
            );
            assert_eq!(model.eval(value.expr()).unwrap().as_i64(), Some(9));
        });
    }
}
