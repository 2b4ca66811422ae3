//! Interprocedural Graph Feature
//!
//! Call-instance subgraphs, execution paths and taint paths.
//!
//! ## Architecture
//!
//! ```text
//! interprocedural
//! ├── domain/
//! │   ├── node          # CallId, Node = (call id, method, instruction)
//! │   ├── path          # Persistent node sequence, merge by common prefix
//! │   └── taint_path    # Ordered key program points ending at the sink
//! └── infrastructure/
//!     ├── key_path      # Prune a CFG to paths visiting keys in order
//!     └── graph         # Per-call-instance graphs, call/return linking
//! ```
//!
//! Each call instance gets its own copy of the (pruned) method graph and its
//! own node → data map, so recursive calls never share per-node state.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallId, Node, Path, TaintPath, TaintPathEntry, TaintPathKind};
pub use infrastructure::{prune, InterproceduralGraph, KeyPathAnalyzer};
