pub mod metrics;
pub mod resolver;

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use metrics::MetricRecord;
pub use resolver::{
    BuildContext, DottedPathResolver, ModuleResolver, ResolutionCache, SegmentResolver,
};

/// Report categories, one pipeline each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TypeSafety,
    Complexity,
    Architecture,
    Packages,
    UnitTests,
    E2eTests,
    Dependencies,
}

impl Category {
    /// Every category in summary display order.
    pub const ALL: [Category; 7] = [
        Category::TypeSafety,
        Category::Complexity,
        Category::Architecture,
        Category::Dependencies,
        Category::UnitTests,
        Category::E2eTests,
        Category::Packages,
    ];

    /// Stable identifier used for file names and JSON keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TypeSafety => "type_safety",
            Category::Complexity => "complexity",
            Category::Architecture => "architecture",
            Category::Packages => "packages",
            Category::UnitTests => "unit_tests",
            Category::E2eTests => "e2e_tests",
            Category::Dependencies => "dependencies",
        }
    }

    /// Human readable title used in rendered documents
    pub fn title(&self) -> &'static str {
        match self {
            Category::TypeSafety => "Type Safety",
            Category::Complexity => "Complexity",
            Category::Architecture => "Architecture Contracts",
            Category::Packages => "Packages",
            Category::UnitTests => "Unit Tests",
            Category::E2eTests => "End-to-End Tests",
            Category::Dependencies => "Dependency Graph",
        }
    }

    /// The dependency graph scans the source tree instead of consuming tool output.
    pub fn needs_signal(&self) -> bool {
        !matches!(self, Category::Dependencies)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "type_safety" | "types" | "typing" => Ok(Category::TypeSafety),
            "complexity" => Ok(Category::Complexity),
            "architecture" | "contracts" => Ok(Category::Architecture),
            "packages" | "deps_inventory" => Ok(Category::Packages),
            "unit_tests" | "unit" => Ok(Category::UnitTests),
            "e2e_tests" | "e2e" => Ok(Category::E2eTests),
            "dependencies" | "graph" | "imports" => Ok(Category::Dependencies),
            _ => Err(Error::Configuration(format!("unknown category '{s}'"))),
        }
    }
}

/// Outcome of a single category check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    /// The check's prerequisite configuration was absent
    NotConfigured,
    /// The check ran but produced nothing to judge
    NoData,
}

impl Status {
    /// Total order used for aggregation. Higher is worse.
    pub fn severity_rank(&self) -> u8 {
        match self {
            Status::NotConfigured | Status::NoData => 0,
            Status::Pass => 1,
            Status::Warn => 2,
            Status::Fail => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Pass => "Pass",
            Status::Warn => "Warning",
            Status::Fail => "Fail",
            Status::NotConfigured => "Not configured",
            Status::NoData => "No data",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw output of an external analysis tool, handed over by a signal collector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSignal {
    pub category: Category,
    /// Where the content came from (file path or a descriptive tag)
    pub origin: String,
    pub content: String,
}

impl RawSignal {
    pub fn new(category: Category, origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            category,
            origin: origin.into(),
            content: content.into(),
        }
    }

    /// Read a signal from disk. Invalid UTF-8 is replaced rather than rejected.
    pub fn from_file(category: Category, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io_at(path, e))?;
        Ok(Self {
            category,
            origin: path.display().to_string(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_aliases() {
        assert_eq!("e2e".parse::<Category>().unwrap(), Category::E2eTests);
        assert_eq!("Type-Safety".parse::<Category>().unwrap(), Category::TypeSafety);
        assert!("coverage".parse::<Category>().is_err());
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&Status::NotConfigured).unwrap();
        assert_eq!(json, "\"NOT_CONFIGURED\"");
    }

    #[test]
    fn test_fail_outranks_everything() {
        for status in [Status::Pass, Status::Warn, Status::NotConfigured, Status::NoData] {
            assert!(Status::Fail.severity_rank() > status.severity_rank());
        }
        assert!(Status::Warn.severity_rank() > Status::Pass.severity_rank());
    }

    #[test]
    fn test_raw_signal_from_file_keeps_unicode() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mypy.txt");
        std::fs::write(&path, "src/app/ü.py:1: error: Größe  [misc]\n").unwrap();

        let signal = RawSignal::from_file(Category::TypeSafety, &path).unwrap();
        assert!(signal.content.contains("Größe"));
        assert!(!signal.is_blank());
    }
}
