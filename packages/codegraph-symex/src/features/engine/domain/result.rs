//! Analysis results

use std::fmt;

use serde::Serialize;

/// Outcome of one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The sink was reached under a satisfiable path condition
    Reachable,
    /// The sink was reached, but its path condition is unsatisfiable
    Unreachable,
    /// The worklist emptied without reaching the sink
    Exhausted,
    /// The solver could not decide the sink's path condition
    Unknown,
    /// The analysis stopped on an internal error
    Failed { reason: String },
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Reachable => write!(f, "reachable"),
            Verdict::Unreachable => write!(f, "unreachable"),
            Verdict::Exhausted => write!(f, "unreachable (exhausted)"),
            Verdict::Unknown => write!(f, "unknown"),
            Verdict::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    /// Worklist pops, including already-processed nodes
    pub iterations: u64,
    pub states_merged: u64,
    /// Nodes whose state was traversed
    pub nodes_processed: u64,
    pub solver_queries: u64,
}

/// Parameter of the outermost frame and its model value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WitnessParameter {
    pub name: String,
    pub ty: String,
    /// `None` when the model leaves the value unconstrained
    pub value: Option<String>,
}

/// Evidence for a reachable verdict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Witness {
    /// Nodes from entry to sink, after merging
    pub path: Vec<String>,
    pub parameters: Vec<WitnessParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    pub stats: AnalysisStats,
}

impl AnalysisResult {
    pub fn new(verdict: Verdict, stats: AnalysisStats) -> Self {
        Self {
            verdict,
            witness: None,
            stats,
        }
    }

    pub fn with_witness(mut self, witness: Witness) -> Self {
        self.witness = Some(witness);
        self
    }

    /// Whether the path may be reachable
    ///
    /// A path that could not be refuted (failure, solver unknown) counts as
    /// reachable.
    pub fn reachable(&self) -> bool {
        !matches!(self.verdict, Verdict::Unreachable | Verdict::Exhausted)
    }

    /// Whether the analysis could not complete
    pub fn failed(&self) -> bool {
        matches!(self.verdict, Verdict::Failed { .. } | Verdict::Unknown)
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} iterations, {} nodes, {} merges, {} solver queries)",
            self.verdict,
            self.stats.iterations,
            self.stats.nodes_processed,
            self.stats.states_merged,
            self.stats.solver_queries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(verdict: Verdict) -> AnalysisResult {
        AnalysisResult::new(verdict, AnalysisStats::default())
    }

    #[test]
    fn test_reachable_and_failed_flags() {
        let cases = [
            (Verdict::Reachable, true, false),
            (Verdict::Unreachable, false, false),
            (Verdict::Exhausted, false, false),
            (Verdict::Unknown, true, true),
            (
                Verdict::Failed {
                    reason: "boom".to_string(),
                },
                true,
                true,
            ),
        ];
        for (verdict, reachable, failed) in cases {
            let r = result(verdict);
            assert_eq!(r.reachable(), reachable, "{}", r.verdict);
            assert_eq!(r.failed(), failed, "{}", r.verdict);
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(result(Verdict::Failed {
            reason: "no body".to_string(),
        }))
        .unwrap();
        assert_eq!(json["verdict"], "failed");
        assert_eq!(json["reason"], "no body");
        assert!(json.get("witness").is_none());
        assert_eq!(json["stats"]["iterations"], 0);
    }
}
