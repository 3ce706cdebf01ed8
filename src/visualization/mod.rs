//! Chart generation behind a pluggable provider.
//!
//! The orchestrator only talks to [`VisualizationProvider`]; swapping the
//! default SVG provider for [`NoCharts`] or a custom one needs no other
//! change. Providers must create the output directory, tolerate empty
//! records and use stable file names so reruns overwrite.

pub mod svg;

use crate::builders::{
    ArchitectureMetrics, ComplexityMetrics, PackageMetrics, TestRunMetrics, TypeSafetyMetrics,
};
use crate::core::{Category, MetricRecord};
use crate::errors::Result;
use crate::graph::GraphMetrics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use svg::{Bar, BarChart, SvgChartProvider};

/// A chart written to disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub category: Category,
    pub name: String,
    pub path: PathBuf,
}

impl ChartArtifact {
    /// Deterministic file name `<category>_<chart>.svg`
    pub fn file_name(category: Category, name: &str) -> String {
        format!("{}_{}.svg", category.as_str(), name)
    }
}

pub trait VisualizationProvider: Send + Sync {
    fn type_safety(&self, metrics: &TypeSafetyMetrics, dir: &Path) -> Result<Vec<ChartArtifact>>;

    fn complexity(&self, metrics: &ComplexityMetrics, dir: &Path) -> Result<Vec<ChartArtifact>>;

    fn architecture(&self, metrics: &ArchitectureMetrics, dir: &Path)
        -> Result<Vec<ChartArtifact>>;

    fn packages(&self, metrics: &PackageMetrics, dir: &Path) -> Result<Vec<ChartArtifact>>;

    fn unit_tests(&self, metrics: &TestRunMetrics, dir: &Path) -> Result<Vec<ChartArtifact>>;

    fn e2e_tests(&self, metrics: &TestRunMetrics, dir: &Path) -> Result<Vec<ChartArtifact>>;

    fn dependencies(&self, metrics: &GraphMetrics, dir: &Path) -> Result<Vec<ChartArtifact>>;

    /// Dispatch on the record's category after creating `dir`. Artifacts
    /// come back sorted by name.
    fn generate(&self, record: &MetricRecord, dir: &Path) -> Result<Vec<ChartArtifact>> {
        crate::io::ensure_dir(dir)?;
        let mut charts = match record {
            MetricRecord::TypeSafety(m) => self.type_safety(m, dir),
            MetricRecord::Complexity(m) => self.complexity(m, dir),
            MetricRecord::Architecture(m) => self.architecture(m, dir),
            MetricRecord::Packages(m) => self.packages(m, dir),
            MetricRecord::UnitTests(m) => self.unit_tests(m, dir),
            MetricRecord::E2eTests(m) => self.e2e_tests(m, dir),
            MetricRecord::Dependencies(m) => self.dependencies(m, dir),
        }?;
        charts.sort();
        Ok(charts)
    }
}

/// Provider that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCharts;

impl VisualizationProvider for NoCharts {
    fn type_safety(&self, _: &TypeSafetyMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }

    fn complexity(&self, _: &ComplexityMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }

    fn architecture(&self, _: &ArchitectureMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }

    fn packages(&self, _: &PackageMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }

    fn unit_tests(&self, _: &TestRunMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }

    fn e2e_tests(&self, _: &TestRunMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }

    fn dependencies(&self, _: &GraphMetrics, _: &Path) -> Result<Vec<ChartArtifact>> {
        Ok(Vec::new())
    }
}
