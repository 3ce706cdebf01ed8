//! Test-run results in the pytest-json-report format.
//!
//! Unit and end-to-end suites share the format and the builder; only the
//! category tag differs.

use super::{percentage, round1, DataBuilder};
use crate::config::TestReportSettings;
use crate::core::{BuildContext, Category, MetricRecord, RawSignal, Status};
use crate::grading::{decide, GradeInput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub nodeid: String,
    pub module: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestTiming {
    pub nodeid: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleTestCounts {
    pub module: String,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunMetrics {
    pub status: Status,
    pub configured: bool,
    pub source: String,
    pub total: usize,
    pub passed: usize,
    /// Failed plus errored tests
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub xfailed: usize,
    pub xpassed: usize,
    pub pass_rate: f64,
    pub duration_seconds: f64,
    pub failures: Vec<TestFailure>,
    pub slowest: Vec<TestTiming>,
    pub modules: Vec<ModuleTestCounts>,
    pub diagnostics: Vec<String>,
}

impl TestRunMetrics {
    pub fn grade_input(&self) -> GradeInput {
        if !self.configured {
            return GradeInput::not_configured();
        }
        if self.total == 0 {
            return GradeInput::no_data();
        }
        GradeInput::counts(self.failed, 0).with_score(self.pass_rate)
    }

    fn empty(source: &str, configured: bool) -> Self {
        Self {
            status: Status::NoData,
            configured,
            source: source.to_string(),
            total: 0,
            passed: 0,
            failed: 0,
            errors: 0,
            skipped: 0,
            xfailed: 0,
            xpassed: 0,
            pass_rate: 0.0,
            duration_seconds: 0.0,
            failures: Vec::new(),
            slowest: Vec::new(),
            modules: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn not_configured(source: &str, reason: &str) -> Self {
        let mut metrics = Self::empty(source, false);
        metrics.diagnostics.push(reason.to_string());
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

#[derive(Debug, Default, Deserialize)]
struct JsonReport {
    #[serde(default)]
    summary: ReportSummary,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    tests: Vec<TestEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportSummary {
    #[serde(default)]
    passed: usize,
    #[serde(default)]
    failed: usize,
    #[serde(default)]
    skipped: usize,
    #[serde(default)]
    error: usize,
    #[serde(default)]
    xfailed: usize,
    #[serde(default)]
    xpassed: usize,
    #[serde(default)]
    total: Option<usize>,
}

impl ReportSummary {
    fn outcome_sum(&self) -> usize {
        self.passed + self.failed + self.skipped + self.error + self.xfailed + self.xpassed
    }

    /// Counts rebuilt from the per-test outcomes.
    fn from_tests(tests: &[TestEntry]) -> Self {
        let mut summary = Self::default();
        for test in tests {
            match test.outcome.as_str() {
                "passed" => summary.passed += 1,
                "failed" => summary.failed += 1,
                "error" => summary.error += 1,
                "skipped" => summary.skipped += 1,
                "xfailed" => summary.xfailed += 1,
                "xpassed" => summary.xpassed += 1,
                other => debug!("ignoring test outcome '{}' for {}", other, test.nodeid),
            }
        }
        summary
    }
}

#[derive(Debug, Deserialize)]
struct TestEntry {
    nodeid: String,
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    setup: Option<TestPhase>,
    #[serde(default)]
    call: Option<TestPhase>,
    #[serde(default)]
    teardown: Option<TestPhase>,
}

#[derive(Debug, Deserialize)]
struct TestPhase {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    longrepr: Option<String>,
    #[serde(default)]
    crash: Option<Crash>,
}

#[derive(Debug, Deserialize)]
struct Crash {
    #[serde(default)]
    message: String,
}

impl TestEntry {
    fn is_failure(&self) -> bool {
        matches!(self.outcome.as_str(), "failed" | "error")
    }

    fn phases(&self) -> impl Iterator<Item = &TestPhase> {
        [&self.call, &self.setup, &self.teardown]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    fn duration(&self) -> f64 {
        if let Some(duration) = self.duration {
            return duration;
        }
        self.phases().filter_map(|p| p.duration).sum()
    }

    /// Crash message from the first phase that has one, else the last
    /// non-empty line of its long representation.
    fn failure_message(&self) -> String {
        let crash = self
            .phases()
            .filter_map(|p| p.crash.as_ref())
            .map(|c| c.message.trim())
            .find(|m| !m.is_empty());
        if let Some(message) = crash {
            return message.to_string();
        }
        self.phases()
            .filter_map(|p| p.longrepr.as_deref())
            .filter_map(|repr| repr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn file_path(&self) -> &str {
        self.nodeid
            .split_once("::")
            .map(|(path, _)| path)
            .unwrap_or(&self.nodeid)
    }
}

#[derive(Debug, Clone)]
pub struct TestRunBuilder {
    category: Category,
    settings: TestReportSettings,
}

impl TestRunBuilder {
    pub fn unit(settings: TestReportSettings) -> Self {
        Self {
            category: Category::UnitTests,
            settings,
        }
    }

    pub fn e2e(settings: TestReportSettings) -> Self {
        Self {
            category: Category::E2eTests,
            settings,
        }
    }

    pub fn parse(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> TestRunMetrics {
        if raw.is_blank() {
            return TestRunMetrics::not_configured(&raw.origin, "test report is empty");
        }
        let report: JsonReport = match serde_json::from_str(&raw.content) {
            Ok(report) => report,
            Err(e) => {
                warn!("{}: invalid test report: {}", raw.origin, e);
                return TestRunMetrics::not_configured(
                    &raw.origin,
                    &format!("invalid test report JSON: {e}"),
                );
            }
        };

        let mut metrics = TestRunMetrics::empty(&raw.origin, true);
        let summary = if report.summary.outcome_sum() == 0 && !report.tests.is_empty() {
            metrics.diagnostics.push(format!(
                "summary has no outcome counts, derived from {} listed tests",
                report.tests.len()
            ));
            ReportSummary::from_tests(&report.tests)
        } else {
            report.summary
        };
        let outcome_sum = summary.outcome_sum();
        metrics.total = summary.total.unwrap_or(outcome_sum);
        if metrics.total != outcome_sum && summary.total.is_some() {
            debug!(
                "{}: summary total {} differs from outcome sum {}",
                raw.origin, metrics.total, outcome_sum
            );
        }
        metrics.passed = summary.passed;
        metrics.errors = summary.error;
        metrics.failed = summary.failed + summary.error;
        metrics.skipped = summary.skipped;
        metrics.xfailed = summary.xfailed;
        metrics.xpassed = summary.xpassed;
        metrics.pass_rate = percentage(metrics.passed, metrics.total);

        let mut modules: BTreeMap<String, ModuleTestCounts> = BTreeMap::new();
        let mut timings = Vec::with_capacity(report.tests.len());
        for test in &report.tests {
            let module = ctx.module_for(test.file_path());
            let counts = modules
                .entry(module.clone())
                .or_insert_with(|| ModuleTestCounts {
                    module: module.clone(),
                    passed: 0,
                    failed: 0,
                });
            if test.is_failure() {
                counts.failed += 1;
                metrics.failures.push(TestFailure {
                    nodeid: test.nodeid.clone(),
                    module,
                    message: test.failure_message(),
                });
            } else if test.outcome == "passed" {
                counts.passed += 1;
            }
            timings.push(TestTiming {
                nodeid: test.nodeid.clone(),
                duration_seconds: test.duration(),
            });
        }

        let listed_failures = metrics.failures.len();
        if listed_failures != metrics.failed {
            metrics.diagnostics.push(format!(
                "summary reports {} failures, {} listed in detail",
                metrics.failed, listed_failures
            ));
        }

        let per_test_total: f64 = timings.iter().map(|t| t.duration_seconds).sum();
        metrics.duration_seconds = round_millis(report.duration.unwrap_or(per_test_total));

        timings.sort_by(|a, b| {
            b.duration_seconds
                .total_cmp(&a.duration_seconds)
                .then_with(|| a.nodeid.cmp(&b.nodeid))
        });
        timings.truncate(self.settings.slowest_n);
        for timing in &mut timings {
            timing.duration_seconds = round_millis(timing.duration_seconds);
        }
        metrics.slowest = timings;
        metrics.modules = modules.into_values().collect();

        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

fn round_millis(seconds: f64) -> f64 {
    if !seconds.is_finite() {
        return 0.0;
    }
    round1(seconds * 100.0) / 100.0
}

impl DataBuilder for TestRunBuilder {
    fn category(&self) -> Category {
        self.category
    }

    fn build(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> MetricRecord {
        let metrics = self.parse(raw, ctx);
        match self.category {
            Category::E2eTests => MetricRecord::E2eTests(metrics),
            _ => MetricRecord::UnitTests(metrics),
        }
    }

    fn not_configured(&self, reason: &str) -> MetricRecord {
        let metrics = TestRunMetrics::not_configured("", reason);
        match self.category {
            Category::E2eTests => MetricRecord::E2eTests(metrics),
            _ => MetricRecord::UnitTests(metrics),
        }
    }
}
