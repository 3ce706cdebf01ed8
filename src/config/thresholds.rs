use serde::{Deserialize, Serialize};

/// Dependency graph thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphThresholds {
    /// Isolated modules tolerated before the graph warns
    #[serde(default = "default_max_isolated")]
    pub max_isolated: usize,

    /// Length of the fan-in / fan-out rankings
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Glob patterns on module names exempt from the isolation check.
    /// Package `__init__` modules are always exempt.
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<String>,
}

impl Default for GraphThresholds {
    fn default() -> Self {
        Self {
            max_isolated: default_max_isolated(),
            top_n: default_top_n(),
            entry_points: default_entry_points(),
        }
    }
}

/// Complexity linter thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    /// Cyclomatic complexity limit the linter was run with
    #[serde(default = "default_max_complexity")]
    pub max_complexity: u32,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Violation count above which complexity fails instead of warning
    #[serde(default)]
    pub fail_over: Option<usize>,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            max_complexity: default_max_complexity(),
            top_n: default_top_n(),
            fail_over: None,
        }
    }
}

/// Package health score penalties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagePenalties {
    #[serde(default = "default_outdated_penalty")]
    pub outdated_penalty: f64,

    #[serde(default = "default_vulnerability_penalty")]
    pub vulnerability_penalty: f64,
}

impl Default for PackagePenalties {
    fn default() -> Self {
        Self {
            outdated_penalty: default_outdated_penalty(),
            vulnerability_penalty: default_vulnerability_penalty(),
        }
    }
}

/// Test report settings shared by unit and end-to-end runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReportSettings {
    /// Number of slowest tests listed
    #[serde(default = "default_top_n")]
    pub slowest_n: usize,
}

impl Default for TestReportSettings {
    fn default() -> Self {
        Self {
            slowest_n: default_top_n(),
        }
    }
}

fn default_max_isolated() -> usize {
    5
}
fn default_top_n() -> usize {
    10
}
fn default_entry_points() -> Vec<String> {
    vec!["*.__main__".to_string(), "__main__".to_string()]
}
fn default_max_complexity() -> u32 {
    10
}
fn default_outdated_penalty() -> f64 {
    2.0
}
fn default_vulnerability_penalty() -> f64 {
    10.0
}

impl ComplexityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_complexity == 0 {
            return Err("complexity.max_complexity must be positive".to_string());
        }
        if self.top_n == 0 {
            return Err("complexity.top_n must be positive".to_string());
        }
        Ok(())
    }
}

impl PackagePenalties {
    pub fn validate(&self) -> Result<(), String> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(self.outdated_penalty) || !valid(self.vulnerability_penalty) {
            return Err("package penalties must be finite and non-negative".to_string());
        }
        Ok(())
    }
}

impl GraphThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.top_n == 0 {
            return Err("graph.top_n must be positive".to_string());
        }
        for pattern in &self.entry_points {
            glob::Pattern::new(pattern)
                .map_err(|e| format!("invalid entry point pattern '{pattern}': {e}"))?;
        }
        Ok(())
    }
}
