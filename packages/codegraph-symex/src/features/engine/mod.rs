//! Engine Feature
//!
//! Worklist search from a method entry to the sink of a taint path.
//!
//! # Structure
//! ```text
//! engine/
//! ├── domain/        # Verdict, AnalysisResult, AnalysisStats, Witness
//! ├── application/   # Engine, Worklist
//! └── ports/         # PathValidator
//! ```
//!
//! # Usage
//! ```text
//! let mut engine = Engine::new(EngineConfig::default())?;
//! let result = engine.analyze(&program, &method, &taint_path);
//! if result.failed() { ... } else if result.reachable() { ... }
//! ```

pub mod application;
pub mod domain;
pub mod ports;

pub use application::{Engine, Worklist};
pub use domain::{AnalysisResult, AnalysisStats, Verdict, Witness, WitnessParameter};
pub use ports::PathValidator;
