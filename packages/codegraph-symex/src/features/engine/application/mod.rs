//! Engine application layer

pub mod engine;
pub mod worklist;

pub use engine::Engine;
pub use worklist::Worklist;
