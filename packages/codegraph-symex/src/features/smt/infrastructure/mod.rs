//! SMT infrastructure

pub mod smtlib;
pub mod solvers;

pub use smtlib::{to_smtlib, SmtLibScript};
