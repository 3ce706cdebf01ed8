//! Tool-output data builders.
//!
//! Each builder is a pure transform from a [`RawSignal`] to a
//! [`MetricRecord`]. Builders never return errors: malformed input is logged
//! and yields a partial record, a `NOT_CONFIGURED` record, or an empty one.
//! Status is always assigned through [`crate::grading::decide`].

pub mod architecture;
pub mod complexity;
pub mod packages;
pub mod test_results;
pub mod type_safety;

use crate::config::QualitymapConfig;
use crate::core::{BuildContext, Category, MetricRecord, RawSignal};

pub use architecture::{ArchitectureBuilder, ArchitectureMetrics, Contract};
pub use complexity::{ComplexityBuilder, ComplexityMetrics, ComplexityViolation, ModuleComplexity};
pub use packages::{OutdatedPackage, PackageBuilder, PackageMetrics, Vulnerability};
pub use test_results::{ModuleTestCounts, TestFailure, TestRunBuilder, TestRunMetrics, TestTiming};
pub use type_safety::{ErrorCodeCount, ModuleErrorCount, TypeError, TypeSafetyBuilder, TypeSafetyMetrics};

/// Shared contract of every tool-output builder.
pub trait DataBuilder: Send + Sync {
    fn category(&self) -> Category;

    /// Transform raw tool output. Must not panic on malformed input.
    fn build(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> MetricRecord;

    /// Record for a category whose signal was absent altogether.
    fn not_configured(&self, reason: &str) -> MetricRecord;
}

/// Percentage `numerator / denominator * 100`, rounded to one decimal.
///
/// A zero denominator yields `0.0`.
pub fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round1(numerator as f64 / denominator as f64 * 100.0)
}

/// Plain ratio with the same zero-denominator rule.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Builder for a tool-output category, `None` for the source-scan category.
pub fn builder_for(category: Category, config: &QualitymapConfig) -> Option<Box<dyn DataBuilder>> {
    match category {
        Category::TypeSafety => Some(Box::new(TypeSafetyBuilder::new())),
        Category::Complexity => Some(Box::new(ComplexityBuilder::new(config.complexity.clone()))),
        Category::Architecture => Some(Box::new(ArchitectureBuilder::new())),
        Category::Packages => Some(Box::new(PackageBuilder::new(config.packages.clone()))),
        Category::UnitTests => Some(Box::new(TestRunBuilder::unit(config.tests.clone()))),
        Category::E2eTests => Some(Box::new(TestRunBuilder::e2e(config.tests.clone()))),
        Category::Dependencies => None,
    }
}
