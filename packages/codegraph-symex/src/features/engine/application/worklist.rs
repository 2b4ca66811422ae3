//! Node worklist with a processed set
//!
//! A node is traversed at most once. Its first graph successor jumps to the
//! front of the queue, every other successor waits at the back, so straight
//! lines run depth-first while branches wait to collect merges.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::features::interprocedural::Node;

#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<Node>,
    processed: FxHashSet<Node>,
}

impl Worklist {
    pub fn new(start: Node) -> Self {
        Self {
            queue: VecDeque::from([start]),
            processed: FxHashSet::default(),
        }
    }

    pub fn pop(&mut self) -> Option<Node> {
        self.queue.pop_front()
    }

    /// Mark `node` processed; `false` when it already was
    pub fn mark_processed(&mut self, node: &Node) -> bool {
        self.processed.insert(node.clone())
    }

    pub fn is_processed(&self, node: &Node) -> bool {
        self.processed.contains(node)
    }

    /// Queue `node` unless it was processed already
    pub fn schedule(&mut self, node: Node, first_successor: bool) {
        if self.is_processed(&node) {
            return;
        }
        if first_successor {
            self.queue.push_front(node);
        } else {
            self.queue.push_back(node);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}
