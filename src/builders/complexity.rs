//! Cyclomatic complexity linter output (flake8/mccabe and ruff `C901`).

use super::{ratio, round1, DataBuilder};
use crate::config::ComplexityThresholds;
use crate::core::{BuildContext, Category, MetricRecord, RawSignal, Status};
use crate::grading::{decide, GradeInput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

static VIOLATION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<path>(?:[A-Za-z]:)?[^:\n]+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s*C901\s+['"`](?P<name>[^'"`]+)['"`]\s+is too complex\s*\(\s*(?P<score>\d+)(?:\s*>\s*(?P<limit>\d+))?\s*\)"#,
    )
    .expect("violation pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityViolation {
    pub module: String,
    pub function: String,
    pub path: String,
    pub line: usize,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleComplexity {
    pub module: String,
    pub violations: usize,
    pub max_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub status: Status,
    pub configured: bool,
    pub source: String,
    pub threshold: u32,
    pub fail_over: Option<usize>,
    pub total_violations: usize,
    /// Reported functions at or under the threshold, not counted as violations
    pub below_threshold: usize,
    pub max_score: u32,
    pub average_score: f64,
    pub modules: Vec<ModuleComplexity>,
    pub top_offenders: Vec<ComplexityViolation>,
    pub unparsed_lines: usize,
    pub diagnostics: Vec<String>,
}

impl ComplexityMetrics {
    pub fn grade_input(&self) -> GradeInput {
        if !self.configured {
            return GradeInput::not_configured();
        }
        let failing = self
            .fail_over
            .is_some_and(|limit| self.total_violations > limit);
        let blocking = if failing { self.total_violations } else { 0 };
        GradeInput::counts(blocking, self.total_violations)
    }
}

#[derive(Debug, Clone)]
pub struct ComplexityBuilder {
    thresholds: ComplexityThresholds,
}

impl ComplexityBuilder {
    pub fn new(thresholds: ComplexityThresholds) -> Self {
        Self { thresholds }
    }

    fn empty(&self, source: &str, configured: bool) -> ComplexityMetrics {
        ComplexityMetrics {
            status: Status::NoData,
            configured,
            source: source.to_string(),
            threshold: self.thresholds.max_complexity,
            fail_over: self.thresholds.fail_over,
            total_violations: 0,
            below_threshold: 0,
            max_score: 0,
            average_score: 0.0,
            modules: Vec::new(),
            top_offenders: Vec::new(),
            unparsed_lines: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> ComplexityMetrics {
        let mut metrics = self.empty(&raw.origin, true);
        let mut violations = Vec::new();

        for line in raw.content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(caps) = VIOLATION_LINE.captures(trimmed) else {
                metrics.unparsed_lines += 1;
                continue;
            };
            let Ok(score) = caps["score"].parse::<u32>() else {
                metrics.unparsed_lines += 1;
                continue;
            };
            if score <= self.thresholds.max_complexity {
                metrics.below_threshold += 1;
                continue;
            }
            let path = caps["path"].to_string();
            violations.push(ComplexityViolation {
                module: ctx.module_for(&path),
                function: caps["name"].to_string(),
                line: caps["line"].parse().unwrap_or(0),
                path,
                score,
            });
        }

        if metrics.below_threshold > 0 {
            debug!(
                "{}: {} reported functions are within the threshold of {}",
                raw.origin, metrics.below_threshold, self.thresholds.max_complexity
            );
            metrics.diagnostics.push(format!(
                "{} reported functions do not exceed the configured threshold",
                metrics.below_threshold
            ));
        }

        metrics.total_violations = violations.len();
        metrics.max_score = violations.iter().map(|v| v.score).max().unwrap_or(0);
        let total_score: f64 = violations.iter().map(|v| f64::from(v.score)).sum();
        metrics.average_score = round1(ratio(total_score, violations.len() as f64));
        metrics.modules = module_breakdown(&violations);

        violations.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.module.cmp(&b.module))
                .then_with(|| a.function.cmp(&b.function))
        });
        violations.truncate(self.thresholds.top_n);
        metrics.top_offenders = violations;

        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

fn module_breakdown(violations: &[ComplexityViolation]) -> Vec<ModuleComplexity> {
    let mut by_module: HashMap<&str, ModuleComplexity> = HashMap::new();
    for violation in violations {
        let entry = by_module
            .entry(violation.module.as_str())
            .or_insert_with(|| ModuleComplexity {
                module: violation.module.clone(),
                violations: 0,
                max_score: 0,
            });
        entry.violations += 1;
        entry.max_score = entry.max_score.max(violation.score);
    }
    let mut modules: Vec<ModuleComplexity> = by_module.into_values().collect();
    modules.sort_by(|a, b| {
        b.violations
            .cmp(&a.violations)
            .then_with(|| a.module.cmp(&b.module))
    });
    modules
}

impl DataBuilder for ComplexityBuilder {
    fn category(&self) -> Category {
        Category::Complexity
    }

    fn build(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> MetricRecord {
        MetricRecord::Complexity(self.parse(raw, ctx))
    }

    fn not_configured(&self, reason: &str) -> MetricRecord {
        let mut metrics = self.empty("", false);
        metrics.diagnostics.push(reason.to_string());
        metrics.status = decide(&metrics.grade_input());
        MetricRecord::Complexity(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SegmentResolver;
    use indoc::indoc;

    fn parse_with(text: &str, thresholds: ComplexityThresholds) -> ComplexityMetrics {
        let resolver = SegmentResolver::new("src", 1);
        let mut ctx = BuildContext::new(&resolver);
        let raw = RawSignal::new(Category::Complexity, "flake8.txt", text);
        ComplexityBuilder::new(thresholds).parse(&raw, &mut ctx)
    }

    fn parse(text: &str) -> ComplexityMetrics {
        parse_with(text, ComplexityThresholds::default())
    }

    #[test]
    fn test_parses_flake8_and_ruff_lines() {
        let metrics = parse(indoc! {r#"
            src/shop/orders.py:10:1: C901 'place_order' is too complex (14)
            src/shop/cart.py:44:5: C901 `Cart.total` is too complex (11 > 10)
            src/billing/invoice.py:3:1: C901 'render' is too complex (23)
        "#});

        assert_eq!(metrics.total_violations, 3);
        assert_eq!(metrics.max_score, 23);
        assert_eq!(metrics.average_score, 16.0);
        assert_eq!(metrics.top_offenders[0].function, "render");
        assert_eq!(metrics.top_offenders[2].function, "Cart.total");
        assert_eq!(metrics.modules[0].module, "shop");
        assert_eq!(metrics.modules[0].violations, 2);
        assert_eq!(metrics.status, Status::Warn);
    }

    #[test]
    fn test_ties_broken_by_module_name() {
        let metrics = parse(indoc! {r#"
            src/zeta/a.py:1:1: C901 'f' is too complex (12)
            src/alpha/b.py:1:1: C901 'g' is too complex (12)
        "#});
        assert_eq!(metrics.top_offenders[0].module, "alpha");
        assert_eq!(metrics.top_offenders[1].module, "zeta");
    }

    #[test]
    fn test_no_violations_is_pass() {
        let metrics = parse("");
        assert_eq!(metrics.total_violations, 0);
        assert_eq!(metrics.average_score, 0.0);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_scores_within_threshold_are_not_violations() {
        let thresholds = ComplexityThresholds {
            max_complexity: 15,
            ..Default::default()
        };
        let metrics = parse_with("src/a/x.py:1:1: C901 'f' is too complex (12)\n", thresholds);
        assert_eq!(metrics.total_violations, 0);
        assert_eq!(metrics.below_threshold, 1);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_fail_over_limit() {
        let thresholds = ComplexityThresholds {
            fail_over: Some(1),
            ..Default::default()
        };
        let metrics = parse_with(
            indoc! {r#"
                src/a/x.py:1:1: C901 'f' is too complex (12)
                src/a/x.py:9:1: C901 'g' is too complex (13)
            "#},
            thresholds,
        );
        assert_eq!(metrics.status, Status::Fail);
    }

    #[test]
    fn test_top_n_truncates_sorted_list() {
        let text: String = (0..1200)
            .map(|i| format!("src/m{}/f.py:{}:1: C901 'fn_{}' is too complex ({})\n", i % 9, i, i, 11 + i % 50))
            .collect();
        let metrics = parse(&text);
        assert_eq!(metrics.total_violations, 1200);
        assert_eq!(metrics.top_offenders.len(), 10);
        assert!(metrics
            .top_offenders
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
        assert_eq!(metrics.max_score, 60);
    }

    #[test]
    fn test_unparseable_lines_counted() {
        let metrics = parse("E501 line too long\nsrc/a.py:1:1: C901 'f' is too complex (abc)\n");
        assert_eq!(metrics.unparsed_lines, 2);
        assert_eq!(metrics.total_violations, 0);
    }
}
