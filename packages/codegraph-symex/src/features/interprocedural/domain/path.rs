//! Execution paths
//!
//! A path is the non-empty sequence of nodes a state has visited. Consecutive
//! nodes are graph successors inside one call instance, or a call site followed
//! by the callee's entry, or a return followed by the node execution resumes at.
//! Paths share structure (`imbl::Vector`), so extending one is cheap.

use std::fmt;

use imbl::Vector;

use super::node::Node;
use crate::errors::{Result, SymexError};

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    nodes: Vector<Node>,
}

impl Path {
    /// Single-node path
    pub fn new(first: Node) -> Self {
        Self {
            nodes: Vector::unit(first),
        }
    }

    /// `None` for an empty sequence
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Option<Self> {
        let nodes: Vector<Node> = nodes.into_iter().collect();
        if nodes.is_empty() {
            None
        } else {
            Some(Self { nodes })
        }
    }

    /// This path extended by `node`
    pub fn push(&self, node: Node) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.push_back(node);
        Self { nodes }
    }

    pub fn last(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn first(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.iter().cloned().collect()
    }

    /// Length of the longest common prefix of two paths
    pub fn common_prefix_len(&self, other: &Path) -> usize {
        self.nodes
            .iter()
            .zip(other.nodes.iter())
            .take_while(|(l, r)| l == r)
            .count()
    }

    /// Path of a merged state: the common prefix of both inputs followed by
    /// their shared last node
    pub fn merge(lhs: &Path, rhs: &Path) -> Result<Path> {
        if lhs.last() != rhs.last() {
            return Err(SymexError::merge(format!(
                "paths end at different nodes: {} and {}",
                lhs.last(),
                rhs.last()
            )));
        }

        let common = lhs.common_prefix_len(rhs);
        let mut nodes = lhs.nodes.take(common);
        if nodes.last() != Some(lhs.last()) {
            nodes.push_back(lhs.last().clone());
        }
        Ok(Path { nodes })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<String> = self.nodes.iter().map(Node::to_string).collect();
        write!(f, "[{}]", nodes.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::interprocedural::domain::CallId;
    use crate::shared::models::{InstrId, MethodRef, Type};
    use pretty_assertions::assert_eq;

    fn node(instr: u32) -> Node {
        Node::new(
            CallId(0),
            MethodRef::new("A", "run", vec![], Type::Void),
            InstrId(instr),
        )
    }

    fn path(instrs: &[u32]) -> Path {
        Path::from_nodes(instrs.iter().map(|i| node(*i))).unwrap()
    }

    #[test]
    fn test_push_keeps_original() {
        let base = path(&[0, 1]);
        let extended = base.push(node(2));
        assert_eq!(base.len(), 2);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended.last(), &node(2));
        assert_eq!(extended.first(), &node(0));
    }

    #[test]
    fn test_merge_diamond() {
        let merged = Path::merge(&path(&[0, 1, 3]), &path(&[0, 2, 3])).unwrap();
        assert_eq!(merged, path(&[0, 3]));
    }

    #[test]
    fn test_merge_reconverging_branches_of_equal_length() {
        // 1 and 2 differ, 4 reappears at the same index on both sides
        let merged = Path::merge(&path(&[0, 1, 4, 5]), &path(&[0, 2, 4, 5])).unwrap();
        assert_eq!(merged, path(&[0, 5]));
    }

    #[test]
    fn test_merge_loop_does_not_repeat_last_node() {
        let merged = Path::merge(&path(&[0, 1, 2]), &path(&[0, 1, 2, 3, 1, 2])).unwrap();
        assert_eq!(merged, path(&[0, 1, 2]));
    }

    #[test]
    fn test_merge_requires_same_last_node() {
        assert!(Path::merge(&path(&[0, 1]), &path(&[0, 2])).is_err());
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(Path::from_nodes(Vec::new()).is_none());
    }
}
