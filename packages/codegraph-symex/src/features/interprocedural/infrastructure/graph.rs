//! Interprocedural graph
//!
//! Materializes one control-flow subgraph per call instance. Each subgraph is
//! the method's instruction graph, pruned by the key-path analyzer when the
//! taint path names instructions of that method. Per-node data (the execution
//! state waiting at a node) is stored with the subgraph it belongs to.
//!
//! ```text
//! new_method_call(m)     ─► fresh CallId, graph(m) ─► entry node
//! unbalanced_return(n)   ─► taint path return entry of n
//!                            ─► fresh CallId, graph(caller) ─► call-site node
//! successors(n)          ─► nodes of n's call instance
//! data(n) / put_data(n)  ─► state stored at n
//! ```

use std::sync::Arc;

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::key_path::prune;
use crate::errors::{Result, SymexError};
use crate::features::interprocedural::domain::{CallId, Node, TaintPath};
use crate::shared::models::{InstrId, MethodBody, MethodRef};
use crate::shared::ports::ProgramModel;

/// Instruction graph of one method, entry vertex first
pub type MethodGraph = DiGraphMap<InstrId, ()>;

/// Full control-flow graph of a method body
pub fn method_graph(body: &MethodBody) -> MethodGraph {
    let mut graph = DiGraphMap::with_capacity(body.len(), body.len());
    for vertex in body.vertices() {
        graph.add_node(vertex);
    }
    for vertex in body.vertices() {
        for &succ in body.successors(vertex) {
            graph.add_edge(vertex, succ, ());
        }
    }
    graph
}

struct CallInstance<T> {
    method: MethodRef,
    graph: Arc<MethodGraph>,
    data: FxHashMap<InstrId, T>,
}

pub struct InterproceduralGraph<'a, T> {
    program: &'a dyn ProgramModel,
    taint_path: &'a TaintPath,
    instances: FxHashMap<CallId, CallInstance<T>>,
    graphs: FxHashMap<MethodRef, Arc<MethodGraph>>,
    next_call_id: u32,
}

impl<'a, T> InterproceduralGraph<'a, T> {
    pub fn new(program: &'a dyn ProgramModel, taint_path: &'a TaintPath) -> Self {
        Self {
            program,
            taint_path,
            instances: FxHashMap::default(),
            graphs: FxHashMap::default(),
            next_call_id: 0,
        }
    }

    pub fn program(&self) -> &'a dyn ProgramModel {
        self.program
    }

    pub fn taint_path(&self) -> &'a TaintPath {
        self.taint_path
    }

    /// Number of call instances created so far
    pub fn call_count(&self) -> usize {
        self.instances.len()
    }

    /// Enter `method` under a fresh call id; returns its entry node
    pub fn new_method_call(&mut self, method: &MethodRef) -> Result<Node> {
        let body = self.body(method)?;
        let call_id = self.instantiate(method)?;
        debug!("New call {} of {}", call_id, method);
        Ok(Node::new(call_id, method.clone(), body.entry()))
    }

    /// Resume in the caller of a method whose own caller was never entered
    ///
    /// `node` is the return instruction. The taint path must name it as a
    /// `return` entry with its call site, and the calling method must own key
    /// instructions.
    pub fn unbalanced_return(&mut self, node: &Node) -> Result<Node> {
        let entry = self
            .taint_path
            .entry_at(&node.method, node.instr)
            .ok_or_else(|| {
                SymexError::UnbalancedReturn(format!("{} is not on the taint path", node))
            })?;
        let (call_site, call_method) = entry.return_site().ok_or_else(|| {
            SymexError::UnbalancedReturn(format!("no call site recorded for {}", node))
        })?;
        if !self.taint_path.has_keys(call_method) {
            return Err(SymexError::UnbalancedReturn(format!(
                "no key instructions in calling method {}",
                call_method
            )));
        }

        let call_method = call_method.clone();
        let call_id = self.instantiate(&call_method)?;
        let resumed = Node::new(call_id, call_method, call_site);
        if !self.contains(&resumed) {
            return Err(SymexError::graph(format!(
                "call site {} is not an instruction of {}",
                call_site, resumed.method
            )));
        }
        debug!("Unbalanced return from {} resumes at {}", node, resumed);
        Ok(resumed)
    }

    /// Successors of `node` inside its call instance, in edge order
    pub fn successors(&self, node: &Node) -> Result<Vec<Node>> {
        let instance = self.instance(node)?;
        Ok(instance
            .graph
            .neighbors_directed(node.instr, Direction::Outgoing)
            .map(|instr| node.with_instr(instr))
            .collect())
    }

    /// First successor, `None` when the node has none left after pruning
    pub fn first_successor(&self, node: &Node) -> Result<Option<Node>> {
        let instance = self.instance(node)?;
        Ok(instance
            .graph
            .neighbors_directed(node.instr, Direction::Outgoing)
            .next()
            .map(|instr| node.with_instr(instr)))
    }

    pub fn data(&self, node: &Node) -> Option<&T> {
        self.instances
            .get(&node.call_id)
            .and_then(|instance| instance.data.get(&node.instr))
    }

    pub fn put_data(&mut self, node: &Node, value: T) -> Result<()> {
        let instance = self
            .instances
            .get_mut(&node.call_id)
            .ok_or_else(|| SymexError::graph(format!("unknown call instance for {}", node)))?;
        instance.data.insert(node.instr, value);
        Ok(())
    }

    fn contains(&self, node: &Node) -> bool {
        self.instances
            .get(&node.call_id)
            .map_or(false, |instance| instance.graph.contains_node(node.instr))
    }

    fn instance(&self, node: &Node) -> Result<&CallInstance<T>> {
        let instance = self
            .instances
            .get(&node.call_id)
            .ok_or_else(|| SymexError::graph(format!("unknown call instance for {}", node)))?;
        if instance.method != node.method {
            return Err(SymexError::graph(format!(
                "{} belongs to {}, not {}",
                node.call_id, instance.method, node.method
            )));
        }
        Ok(instance)
    }

    fn body(&self, method: &MethodRef) -> Result<Arc<MethodBody>> {
        self.program
            .body(method)
            .ok_or_else(|| SymexError::graph(format!("no body for {}", method)))
    }

    fn instantiate(&mut self, method: &MethodRef) -> Result<CallId> {
        let graph = self.graph_of(method)?;
        let call_id = CallId(self.next_call_id);
        self.next_call_id += 1;
        self.instances.insert(
            call_id,
            CallInstance {
                method: method.clone(),
                graph,
                data: FxHashMap::default(),
            },
        );
        Ok(call_id)
    }

    /// Pruned graph of `method`, built once per method
    fn graph_of(&mut self, method: &MethodRef) -> Result<Arc<MethodGraph>> {
        if let Some(graph) = self.graphs.get(method) {
            return Ok(Arc::clone(graph));
        }

        let body = self.body(method)?;
        let full = method_graph(&body);
        let keys = self.taint_path.key_instructions(method);
        let graph = if keys.is_empty() {
            full
        } else {
            debug!("Pruning {} to {} key instructions", method, keys.len());
            prune(&full, &keys).map_err(|e| {
                SymexError::graph(format!("pruning {} failed: {}", method, e))
            })?
        };

        let graph = Arc::new(graph);
        self.graphs.insert(method.clone(), Arc::clone(&graph));
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::interprocedural::domain::{TaintPathEntry, TaintPathKind};
    use crate::shared::models::{BinaryOp, Immediate, Instruction, Rvalue, Type};
    use crate::shared::ports::Program;

    fn method(name: &str) -> MethodRef {
        MethodRef::new("app.Main", name, vec![], Type::Void)
    }

    /// 0: if 1 == 1 goto 2; 1: return; 2: nop; 3: return
    fn branching(name: &str) -> MethodBody {
        MethodBody::new(
            method(name),
            vec![],
            vec![
                Instruction::If {
                    condition: Rvalue::Binary {
                        op: BinaryOp::Eq,
                        lhs: Immediate::int(1),
                        rhs: Immediate::int(1),
                        ty: Type::Boolean,
                    },
                    target: InstrId(2),
                },
                Instruction::ReturnVoid,
                Instruction::Nop,
                Instruction::ReturnVoid,
            ],
        )
        .unwrap()
    }

    fn program() -> Program {
        Program::new()
            .with_method(branching("caller"))
            .with_method(branching("callee"))
    }

    #[test]
    fn test_calls_get_fresh_ids() {
        let program = program();
        let path = TaintPath::new(vec![TaintPathEntry::sink(method("caller"), InstrId(3))]).unwrap();
        let mut graph: InterproceduralGraph<'_, u32> = InterproceduralGraph::new(&program, &path);

        let first = graph.new_method_call(&method("callee")).unwrap();
        let second = graph.new_method_call(&method("callee")).unwrap();
        assert_ne!(first.call_id, second.call_id);
        assert_eq!(first.instr, InstrId(0));
        assert_eq!(graph.call_count(), 2);

        // callee has no keys: both branches remain
        assert_eq!(graph.successors(&first).unwrap().len(), 2);
    }

    #[test]
    fn test_key_instructions_prune_the_graph() {
        let program = program();
        let path = TaintPath::new(vec![TaintPathEntry::sink(method("caller"), InstrId(3))]).unwrap();
        let mut graph: InterproceduralGraph<'_, u32> = InterproceduralGraph::new(&program, &path);

        let entry = graph.new_method_call(&method("caller")).unwrap();
        let succs = graph.successors(&entry).unwrap();
        assert_eq!(succs, vec![entry.with_instr(InstrId(2))]);
        assert_eq!(
            graph.first_successor(&entry.with_instr(InstrId(1))).unwrap(),
            None
        );
    }

    #[test]
    fn test_data_is_per_call_instance() {
        let program = program();
        let path = TaintPath::new(vec![TaintPathEntry::sink(method("caller"), InstrId(3))]).unwrap();
        let mut graph = InterproceduralGraph::new(&program, &path);

        let first = graph.new_method_call(&method("callee")).unwrap();
        let second = graph.new_method_call(&method("callee")).unwrap();
        graph.put_data(&first, 7u32).unwrap();
        assert_eq!(graph.data(&first), Some(&7));
        assert_eq!(graph.data(&second), None);

        let unknown = Node::new(CallId(99), method("callee"), InstrId(0));
        assert!(graph.put_data(&unknown, 1).is_err());
        assert!(graph.successors(&unknown).is_err());
    }

    #[test]
    fn test_unbalanced_return_resumes_at_call_site() {
        let program = program();
        let path = TaintPath::new(vec![
            TaintPathEntry::returning(method("callee"), InstrId(3), InstrId(2), method("caller")),
            TaintPathEntry::sink(method("caller"), InstrId(3)),
        ])
        .unwrap();
        let mut graph: InterproceduralGraph<'_, u32> = InterproceduralGraph::new(&program, &path);

        let callee = graph.new_method_call(&method("callee")).unwrap();
        let ret = callee.with_instr(InstrId(3));
        let resumed = graph.unbalanced_return(&ret).unwrap();
        assert_eq!(resumed.method, method("caller"));
        assert_eq!(resumed.instr, InstrId(2));
        assert_ne!(resumed.call_id, callee.call_id);
    }

    #[test]
    fn test_unbalanced_return_without_metadata_fails() {
        let program = program();
        let path = TaintPath::new(vec![
            TaintPathEntry::new(TaintPathKind::Return, method("callee"), InstrId(3)),
            TaintPathEntry::sink(method("caller"), InstrId(3)),
        ])
        .unwrap();
        let mut graph: InterproceduralGraph<'_, u32> = InterproceduralGraph::new(&program, &path);

        let callee = graph.new_method_call(&method("callee")).unwrap();
        let err = graph.unbalanced_return(&callee.with_instr(InstrId(3))).unwrap_err();
        assert!(matches!(err, SymexError::UnbalancedReturn(_)));

        let off_path = graph.unbalanced_return(&callee.with_instr(InstrId(1))).unwrap_err();
        assert!(matches!(off_path, SymexError::UnbalancedReturn(_)));
    }

    #[test]
    fn test_missing_body_is_a_graph_error() {
        let program = program();
        let path = TaintPath::new(vec![TaintPathEntry::sink(method("caller"), InstrId(3))]).unwrap();
        let mut graph: InterproceduralGraph<'_, u32> = InterproceduralGraph::new(&program, &path);
        assert!(graph.new_method_call(&method("missing")).is_err());
    }
}
