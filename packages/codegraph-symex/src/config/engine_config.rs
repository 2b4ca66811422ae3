//! Engine configuration
//!
//! ```yaml
//! preset: balanced
//! max_method_calls: 4
//! produce_model: true
//! solver:
//!   backend: z3             # default when built with `z3`, else lightweight
//!   timeout_ms: 10000
//!   max_assignments: 50000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;

/// Solver backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Built-in evaluator and bounded model search (always available)
    Lightweight,
    /// Z3 via SMT-LIB (requires the `z3` feature)
    Z3,
}

impl SolverBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lightweight => "lightweight",
            Self::Z3 => "z3",
        }
    }

    /// Whether this backend is compiled into the current build
    pub fn is_available(&self) -> bool {
        match self {
            Self::Lightweight => true,
            Self::Z3 => cfg!(feature = "z3"),
        }
    }
}

/// Z3 when compiled in; the lightweight search answers unknown on formulas
/// it cannot pin down by candidates (e.g. `x * 3 == 21`)
impl Default for SolverBackend {
    fn default() -> Self {
        if cfg!(feature = "z3") {
            Self::Z3
        } else {
            Self::Lightweight
        }
    }
}

/// Solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    #[serde(default)]
    pub backend: SolverBackend,

    /// Per-query timeout for external solvers in milliseconds (1..=3600000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,

    /// Candidate assignments tried by the lightweight solver (1..=10000000)
    #[serde(default = "default_max_assignments")]
    pub max_assignments: usize,
}

fn default_timeout_ms() -> u32 {
    10_000
}

fn default_max_assignments() -> usize {
    50_000
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::default(),
            timeout_ms: default_timeout_ms(),
            max_assignments: default_max_assignments(),
        }
    }
}

impl SolverConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                backend: SolverBackend::Lightweight,
                timeout_ms: 2_000,
                max_assignments: 5_000,
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                backend: SolverBackend::default(),
                timeout_ms: 60_000,
                max_assignments: 1_000_000,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_ms == 0 || self.timeout_ms > 3_600_000 {
            return Err(ConfigError::range_with_hint(
                "solver.timeout_ms",
                self.timeout_ms,
                1,
                3_600_000,
                "Solver timeout should be at most 1 hour",
            ));
        }

        if self.max_assignments == 0 || self.max_assignments > 10_000_000 {
            return Err(ConfigError::range_with_hint(
                "solver.max_assignments",
                self.max_assignments,
                1,
                10_000_000,
                "Model search budget must be finite",
            ));
        }

        if !self.backend.is_available() {
            return Err(ConfigError::BackendUnavailable(
                self.backend.as_str().to_string(),
            ));
        }

        Ok(())
    }
}

/// Symbolic engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Preset the remaining fields were derived from
    #[serde(default)]
    pub preset: Preset,

    /// Calls to the same method along one lineage before further calls are mocked (1..=64)
    #[serde(default = "default_max_method_calls")]
    pub max_method_calls: u32,

    /// Attach witness path and parameter values to reachable verdicts
    #[serde(default = "default_true")]
    pub produce_model: bool,

    #[serde(default)]
    pub solver: SolverConfig,
}

fn default_max_method_calls() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl EngineConfig {
    /// Create configuration from a preset
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            max_method_calls: default_max_method_calls(),
            produce_model: !matches!(preset, Preset::Fast),
            solver: SolverConfig::from_preset(preset),
        }
    }

    /// Builder: Set max_method_calls
    pub fn max_method_calls(mut self, v: u32) -> Self {
        self.max_method_calls = v;
        self
    }

    /// Builder: Set produce_model
    pub fn produce_model(mut self, v: bool) -> Self {
        self.produce_model = v;
        self
    }

    /// Builder: Modify solver settings
    pub fn solver<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SolverConfig) -> SolverConfig,
    {
        self.solver = f(self.solver);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_method_calls == 0 || self.max_method_calls > 64 {
            return Err(ConfigError::range_with_hint(
                "max_method_calls",
                self.max_method_calls,
                1,
                64,
                "A method must be enterable at least once",
            ));
        }

        self.solver.validate()
    }

    /// Parse and validate YAML
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl SolverConfig {
    /// Builder: Set backend
    pub fn backend(mut self, v: SolverBackend) -> Self {
        self.backend = v;
        self
    }

    /// Builder: Set timeout_ms
    pub fn timeout_ms(mut self, v: u32) -> Self {
        self.timeout_ms = v;
        self
    }

    /// Builder: Set max_assignments
    pub fn max_assignments(mut self, v: usize) -> Self {
        self.max_assignments = v;
        self
    }
}
