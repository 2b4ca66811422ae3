//! Engine ports

pub mod path_validator;

pub use path_validator::PathValidator;
