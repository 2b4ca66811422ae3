//! Interprocedural domain: nodes, paths, taint paths

pub mod node;
pub mod path;
pub mod taint_path;

pub use node::{CallId, Node};
pub use path::Path;
pub use taint_path::{TaintPath, TaintPathEntry, TaintPathKind};
