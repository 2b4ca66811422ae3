//! Engine configuration
//!
//! - `EngineConfig`: mocking bound, model extraction, solver settings
//! - `Preset`: fast / balanced / thorough defaults
//! - YAML load/save through `serde_yaml`

pub mod engine_config;
pub mod error;
pub mod preset;

pub use engine_config::{EngineConfig, SolverBackend, SolverConfig};
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
