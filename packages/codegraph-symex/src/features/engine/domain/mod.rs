//! Engine domain: verdicts, statistics and witnesses

pub mod result;

pub use result::{AnalysisResult, AnalysisStats, Verdict, Witness, WitnessParameter};
