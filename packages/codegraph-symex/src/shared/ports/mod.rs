//! Ports to external collaborators

pub mod program;

pub use program::{Program, ProgramModel, ProgramDocument};
