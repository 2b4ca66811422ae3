//! Interprocedural infrastructure: key-path pruning and the call-instance graph

pub mod graph;
pub mod key_path;

pub use graph::{method_graph, InterproceduralGraph, MethodGraph};
pub use key_path::{prune, KeyPathAnalyzer};
