use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::thresholds::{
    ComplexityThresholds, GraphThresholds, PackagePenalties, TestReportSettings,
};
use crate::core::{Category, DottedPathResolver, ModuleResolver, SegmentResolver};

/// Directory names skipped while scanning source files.
///
/// Test directories are deliberately absent: excluding them is a per-project
/// decision made through `source.exclude` or `source.extra_exclude`.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".tox",
    ".nox",
    "build",
    "dist",
    ".eggs",
    "node_modules",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "site-packages",
];

/// Root configuration structure for qualitymap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitymapConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub graph: GraphThresholds,

    #[serde(default)]
    pub complexity: ComplexityThresholds,

    #[serde(default)]
    pub packages: PackagePenalties,

    #[serde(default)]
    pub tests: TestReportSettings,

    #[serde(default)]
    pub signals: SignalsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Display name used in report headings
    #[serde(default)]
    pub name: Option<String>,
}

/// How module names are derived from tool-reported paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// First `module_depth` segments after `root_prefix`
    #[default]
    Segment,
    /// Full dotted path after `root_prefix`
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory that tool output paths are relative to, e.g. `src`
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,

    #[serde(default = "default_module_depth")]
    pub module_depth: usize,

    #[serde(default)]
    pub resolver: ResolverKind,

    /// Replaces the default exclusion set when present
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// Added on top of the active exclusion set
    #[serde(default)]
    pub extra_exclude: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_prefix: default_root_prefix(),
            module_depth: default_module_depth(),
            resolver: ResolverKind::default(),
            exclude: None,
            extra_exclude: Vec::new(),
        }
    }
}

impl SourceConfig {
    /// Active exclusion set: explicit list or defaults, plus extras.
    pub fn excluded_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = match &self.exclude {
            Some(explicit) => explicit.clone(),
            None => DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        };
        dirs.extend(self.extra_exclude.iter().cloned());
        dirs.sort();
        dirs.dedup();
        dirs
    }

    pub fn resolver(&self) -> Box<dyn ModuleResolver> {
        match self.resolver {
            ResolverKind::Segment => {
                Box::new(SegmentResolver::new(&self.root_prefix, self.module_depth))
            }
            ResolverKind::Dotted => Box::new(DottedPathResolver::new(Some(&self.root_prefix))),
        }
    }
}

/// File names of raw tool output inside a signals directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default = "default_type_safety_signal")]
    pub type_safety: String,
    #[serde(default = "default_complexity_signal")]
    pub complexity: String,
    #[serde(default = "default_architecture_signal")]
    pub architecture: String,
    #[serde(default = "default_packages_signal")]
    pub packages: String,
    #[serde(default = "default_unit_tests_signal")]
    pub unit_tests: String,
    #[serde(default = "default_e2e_tests_signal")]
    pub e2e_tests: String,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            type_safety: default_type_safety_signal(),
            complexity: default_complexity_signal(),
            architecture: default_architecture_signal(),
            packages: default_packages_signal(),
            unit_tests: default_unit_tests_signal(),
            e2e_tests: default_e2e_tests_signal(),
        }
    }
}

impl SignalsConfig {
    /// Signal file name for a category, `None` for categories without tool output
    pub fn file_name(&self, category: Category) -> Option<&str> {
        match category {
            Category::TypeSafety => Some(&self.type_safety),
            Category::Complexity => Some(&self.complexity),
            Category::Architecture => Some(&self.architecture),
            Category::Packages => Some(&self.packages),
            Category::UnitTests => Some(&self.unit_tests),
            Category::E2eTests => Some(&self.e2e_tests),
            Category::Dependencies => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory whose templates override the built-in ones
    #[serde(default)]
    pub templates: Option<PathBuf>,

    /// Render charts with the default provider
    #[serde(default = "default_true")]
    pub charts: bool,

    /// File name of the summary document at the output root
    #[serde(default = "default_summary_name")]
    pub summary_name: String,

    /// Worker count for category pipelines, 0 = one per CPU
    #[serde(default)]
    pub jobs: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            templates: None,
            charts: true,
            summary_name: default_summary_name(),
            jobs: 0,
        }
    }
}

fn default_root_prefix() -> String {
    "src".to_string()
}
fn default_module_depth() -> usize {
    1
}
fn default_type_safety_signal() -> String {
    "type_safety.txt".to_string()
}
fn default_complexity_signal() -> String {
    "complexity.txt".to_string()
}
fn default_architecture_signal() -> String {
    "architecture.txt".to_string()
}
fn default_packages_signal() -> String {
    "packages.json".to_string()
}
fn default_unit_tests_signal() -> String {
    "unit_tests.json".to_string()
}
fn default_e2e_tests_signal() -> String {
    "e2e_tests.json".to_string()
}
fn default_summary_name() -> String {
    "summary.md".to_string()
}
fn default_true() -> bool {
    true
}
