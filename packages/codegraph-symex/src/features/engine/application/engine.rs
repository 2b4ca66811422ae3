//! Symbolic Engine
//!
//! Decides whether a taint path can be followed from the entry of a method
//! to its sink.
//!
//! ## Algorithm
//! 1. Enter the analyzed method under a fresh call id; its entry node holds
//!    the initial state.
//! 2. Pop a node; skip it when already processed.
//! 3. If its instruction is the sink, query the solver on the state's path
//!    condition: SAT is reachable, UNSAT unreachable.
//! 4. Otherwise traverse the state. Each successor state is merged into the
//!    state already stored at its node, stored, and the node is queued (front
//!    for the popped node's first successor, back otherwise).
//! 5. An empty worklist means the sink is unreachable (exhausted).
//!
//! Any error inside the loop ends the analysis as [`Verdict::Failed`].

use tracing::{debug, info, warn};

use super::worklist::Worklist;
use crate::config::EngineConfig;
use crate::errors::{Result, SymexError};
use crate::features::engine::domain::{
    AnalysisResult, AnalysisStats, Verdict, Witness, WitnessParameter,
};
use crate::features::execution::{
    ExecutionState, ExecutionStateMerger, MockingPolicy, Traverser,
};
use crate::features::interprocedural::{InterproceduralGraph, TaintPath};
use crate::features::smt::{create_solver, ConstraintSolver, Expr, Model, SolverResult};
use crate::features::symbolic::SymbolicContext;
use crate::shared::models::MethodRef;
use crate::shared::ports::ProgramModel;

pub struct Engine {
    config: EngineConfig,
    solver: Box<dyn ConstraintSolver>,
}

impl Engine {
    /// Engine with the configured solver backend
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let solver = create_solver(&config.solver)?;
        Ok(Self { config, solver })
    }

    /// Engine with a caller-provided solver
    pub fn with_solver(config: EngineConfig, solver: Box<dyn ConstraintSolver>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Decide whether `taint_path` is reachable from the entry of `method`
    pub fn analyze(
        &mut self,
        program: &dyn ProgramModel,
        method: &MethodRef,
        taint_path: &TaintPath,
    ) -> AnalysisResult {
        info!(
            "Analyzing {} against a taint path of {} entries ({} solver)",
            method,
            taint_path.len(),
            self.solver.name()
        );
        let mut stats = AnalysisStats::default();
        let result = match self.search(program, method, taint_path, &mut stats) {
            Ok(result) => result,
            Err(e) => {
                warn!("Analysis of {} failed: {}", method, e);
                AnalysisResult::new(
                    Verdict::Failed {
                        reason: e.to_string(),
                    },
                    stats,
                )
            }
        };
        info!("{}: {}", method, result);
        result
    }

    fn search(
        &mut self,
        program: &dyn ProgramModel,
        method: &MethodRef,
        taint_path: &TaintPath,
        stats: &mut AnalysisStats,
    ) -> Result<AnalysisResult> {
        let mut graph = InterproceduralGraph::new(program, taint_path);
        let mut context = SymbolicContext::new();
        let mocking = MockingPolicy::new(self.config.max_method_calls);

        let entry = graph.new_method_call(method)?;
        graph.put_data(&entry, ExecutionState::initial(entry.clone()))?;
        let mut worklist = Worklist::new(entry);

        while let Some(node) = worklist.pop() {
            stats.iterations += 1;
            if !worklist.mark_processed(&node) {
                continue;
            }
            let state = graph
                .data(&node)
                .cloned()
                .ok_or_else(|| SymexError::MissingState(format!("no state at {}", node)))?;
            stats.nodes_processed += 1;

            if taint_path.is_sink(state.top_method(), state.top_instr()) {
                debug!("Sink reached at {} after {} iterations", node, stats.iterations);
                return self.check(&state, stats);
            }

            let first = graph.first_successor(&node)?;
            let successors = Traverser::new(&mut graph, &mut context, mocking).traverse(&state)?;
            for incoming in successors {
                let target = incoming.top_node().clone();
                let stored = match graph.data(&target) {
                    Some(previous) => {
                        stats.states_merged += 1;
                        ExecutionStateMerger::new(&mut context).merge(previous, &incoming)?
                    }
                    None => incoming,
                };
                graph.put_data(&target, stored)?;

                let is_first = first.as_ref().map(|n| n.instr) == Some(target.instr);
                worklist.schedule(target, is_first);
            }
        }

        debug!(
            "Worklist exhausted after {} iterations, {} call instances",
            stats.iterations,
            graph.call_count()
        );
        Ok(AnalysisResult::new(Verdict::Exhausted, stats.clone()))
    }

    fn check(&mut self, state: &ExecutionState, stats: &mut AnalysisStats) -> Result<AnalysisResult> {
        let constraints: Vec<Expr> = state.symbolic_state().constraints().iter().cloned().collect();
        stats.solver_queries += 1;
        debug!(
            "Querying {} with {} constraints",
            self.solver.name(),
            constraints.len()
        );

        match self.solver.check(&constraints)? {
            SolverResult::Sat(model) => {
                let result = AnalysisResult::new(Verdict::Reachable, stats.clone());
                if self.config.produce_model {
                    Ok(result.with_witness(witness(state, &model)))
                } else {
                    Ok(result)
                }
            }
            SolverResult::Unsat => Ok(AnalysisResult::new(Verdict::Unreachable, stats.clone())),
            SolverResult::Unknown => {
                warn!("{} could not decide the sink's path condition", self.solver.name());
                Ok(AnalysisResult::new(Verdict::Unknown, stats.clone()))
            }
        }
    }
}

fn witness(state: &ExecutionState, model: &Model) -> Witness {
    Witness {
        path: state.path().iter().map(|node| node.to_string()).collect(),
        parameters: state
            .root_frame()
            .parameters
            .iter()
            .map(|parameter| WitnessParameter {
                name: parameter.id.name.to_string(),
                ty: parameter.id.ty.to_string(),
                value: model
                    .eval(parameter.value.expr())
                    .ok()
                    .map(|value| value.to_string()),
            })
            .collect(),
    }
}
