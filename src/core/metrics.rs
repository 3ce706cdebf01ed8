use crate::builders::{
    ArchitectureMetrics, ComplexityMetrics, PackageMetrics, TestRunMetrics, TypeSafetyMetrics,
};
use crate::core::{Category, Status};
use crate::graph::GraphMetrics;
use crate::grading::GradeInput;
use serde::{Deserialize, Serialize};

/// Structured result of one category pipeline.
///
/// Serialized with an internal `category` tag so each data file is
/// self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum MetricRecord {
    TypeSafety(TypeSafetyMetrics),
    Complexity(ComplexityMetrics),
    Architecture(ArchitectureMetrics),
    Packages(PackageMetrics),
    UnitTests(TestRunMetrics),
    E2eTests(TestRunMetrics),
    Dependencies(GraphMetrics),
}

impl MetricRecord {
    pub fn category(&self) -> Category {
        match self {
            MetricRecord::TypeSafety(_) => Category::TypeSafety,
            MetricRecord::Complexity(_) => Category::Complexity,
            MetricRecord::Architecture(_) => Category::Architecture,
            MetricRecord::Packages(_) => Category::Packages,
            MetricRecord::UnitTests(_) => Category::UnitTests,
            MetricRecord::E2eTests(_) => Category::E2eTests,
            MetricRecord::Dependencies(_) => Category::Dependencies,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            MetricRecord::TypeSafety(m) => m.status,
            MetricRecord::Complexity(m) => m.status,
            MetricRecord::Architecture(m) => m.status,
            MetricRecord::Packages(m) => m.status,
            MetricRecord::UnitTests(m) | MetricRecord::E2eTests(m) => m.status,
            MetricRecord::Dependencies(m) => m.status,
        }
    }

    pub fn grade_input(&self) -> GradeInput {
        match self {
            MetricRecord::TypeSafety(m) => m.grade_input(),
            MetricRecord::Complexity(m) => m.grade_input(),
            MetricRecord::Architecture(m) => m.grade_input(),
            MetricRecord::Packages(m) => m.grade_input(),
            MetricRecord::UnitTests(m) | MetricRecord::E2eTests(m) => m.grade_input(),
            MetricRecord::Dependencies(m) => m.grade_input(),
        }
    }

    /// Reasons a record is partial or not configured
    pub fn diagnostics(&self) -> &[String] {
        match self {
            MetricRecord::TypeSafety(m) => &m.diagnostics,
            MetricRecord::Complexity(m) => &m.diagnostics,
            MetricRecord::Architecture(m) => &m.diagnostics,
            MetricRecord::Packages(m) => &m.diagnostics,
            MetricRecord::UnitTests(m) | MetricRecord::E2eTests(m) => &m.diagnostics,
            MetricRecord::Dependencies(m) => &m.diagnostics,
        }
    }
}
