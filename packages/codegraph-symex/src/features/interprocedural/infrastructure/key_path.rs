//! Key-Path Analyzer
//!
//! Prunes a method's control-flow graph to the edges that lie on some path
//! visiting the key vertices in order.
//!
//! ```text
//! 1. rank(v) = |V| - finished_before(v) - 1     (DFS from the entry vertex)
//! 2. cur = entry
//!    for key in keys:
//!        ok += key
//!        walk(cur, key): skip successors ranked above key,
//!                        keep u -> s when s ends up in ok (then u is ok)
//!        cur = key
//! ```
//!
//! The visited and admissible sets persist across keys, so each vertex is
//! walked at most once after the first time it is reached. Both depth-first
//! passes use an explicit stack.

use petgraph::graphmap::{DiGraphMap, NodeTrait};
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::errors::{Result, SymexError};

pub struct KeyPathAnalyzer<'g, N: NodeTrait> {
    graph: &'g DiGraphMap<N, ()>,
    keys: &'g [N],
}

impl<'g, N: NodeTrait + std::fmt::Debug> KeyPathAnalyzer<'g, N> {
    /// `graph`'s first inserted node is its entry
    pub fn new(graph: &'g DiGraphMap<N, ()>, keys: &'g [N]) -> Self {
        Self { graph, keys }
    }

    /// Graph with every vertex of the input and only the admissible edges
    pub fn analyze(&self) -> Result<DiGraphMap<N, ()>> {
        let entry = self
            .graph
            .nodes()
            .next()
            .ok_or_else(|| SymexError::graph("cannot prune an empty graph"))?;
        let rank = self.rank(entry);

        let mut pruned = DiGraphMap::with_capacity(self.graph.node_count(), self.graph.edge_count());
        for node in self.graph.nodes() {
            pruned.add_node(node);
        }

        let mut visited = FxHashSet::default();
        let mut ok = FxHashSet::default();
        let mut cur = entry;
        for &key in self.keys {
            let key_rank = *rank.get(&key).ok_or_else(|| {
                SymexError::graph(format!("key vertex {:?} is unreachable from the entry", key))
            })?;
            ok.insert(key);
            self.walk(cur, key_rank, &rank, &mut visited, &mut ok, &mut pruned);
            cur = key;
        }

        trace!(
            "Pruned {} edges to {}",
            self.graph.edge_count(),
            pruned.edge_count()
        );
        Ok(pruned)
    }

    fn successors(&self, node: N) -> Vec<N> {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect()
    }

    /// Reverse finishing order of a depth-first search from `entry`
    fn rank(&self, entry: N) -> FxHashMap<N, usize> {
        let total = self.graph.node_count();
        let mut rank = FxHashMap::default();
        let mut seen = FxHashSet::default();
        let mut stack = vec![(entry, self.successors(entry), 0usize)];
        seen.insert(entry);

        while let Some((node, succs, next)) = stack.last_mut() {
            if let Some(&succ) = succs.get(*next) {
                *next += 1;
                if seen.insert(succ) {
                    let succ_succs = self.successors(succ);
                    stack.push((succ, succ_succs, 0));
                }
            } else {
                let finished = rank.len();
                rank.insert(*node, total - finished - 1);
                stack.pop();
            }
        }
        rank
    }

    fn walk(
        &self,
        start: N,
        key_rank: usize,
        rank: &FxHashMap<N, usize>,
        visited: &mut FxHashSet<N>,
        ok: &mut FxHashSet<N>,
        pruned: &mut DiGraphMap<N, ()>,
    ) {
        struct Frame<N> {
            node: N,
            succs: Vec<N>,
            next: usize,
            descended: bool,
        }

        visited.insert(start);
        let mut stack = vec![Frame {
            node: start,
            succs: self.successors(start),
            next: 0,
            descended: false,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(&succ) = frame.succs.get(frame.next) else {
                stack.pop();
                continue;
            };
            let u = frame.node;

            if rank.get(&succ).map_or(true, |r| *r > key_rank) {
                frame.next += 1;
                continue;
            }

            if !frame.descended && !visited.contains(&succ) {
                frame.descended = true;
                visited.insert(succ);
                let succs = self.successors(succ);
                stack.push(Frame {
                    node: succ,
                    succs,
                    next: 0,
                    descended: false,
                });
                continue;
            }

            frame.descended = false;
            frame.next += 1;
            if ok.contains(&succ) {
                pruned.add_edge(u, succ, ());
                ok.insert(u);
            }
        }
    }
}

/// Prune `graph` to the paths visiting `keys` in order
pub fn prune<N: NodeTrait + std::fmt::Debug>(
    graph: &DiGraphMap<N, ()>,
    keys: &[N],
) -> Result<DiGraphMap<N, ()>> {
    KeyPathAnalyzer::new(graph, keys).analyze()
}
