//! Type checker output (mypy style).
//!
//! Lines look like `path:line[:col]: severity: message  [code]`. Only
//! `error` lines count toward the total; warnings and notes are tallied
//! separately so the report can mention them.

use super::DataBuilder;
use crate::core::{BuildContext, Category, MetricRecord, RawSignal, Status};
use crate::grading::{decide, GradeInput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

static DIAGNOSTIC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<path>(?:[A-Za-z]:)?[^:\n]+?):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?P<severity>error|warning|note):\s*(?P<message>.*?)(?:\s+\[(?P<code>[A-Za-z0-9_-]+)\])?\s*$",
    )
    .expect("diagnostic line pattern is valid")
});

static FOUND_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Found (?P<errors>\d+) errors? in (?P<files>\d+) files?")
        .expect("summary pattern is valid")
});

/// Code assigned to diagnostics printed without one
pub const UNCATEGORIZED_CODE: &str = "misc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeError {
    pub path: String,
    pub line: usize,
    pub column: Option<usize>,
    pub module: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleErrorCount {
    pub module: String,
    pub errors: usize,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCodeCount {
    pub code: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSafetyMetrics {
    pub status: Status,
    pub configured: bool,
    pub source: String,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_notes: usize,
    pub files_with_errors: usize,
    /// Count printed by the checker's own summary line, when present
    pub reported_total: Option<usize>,
    /// Sorted by error count, descending
    pub modules: Vec<ModuleErrorCount>,
    pub error_codes: Vec<ErrorCodeCount>,
    pub errors: Vec<TypeError>,
    pub unparsed_lines: usize,
    pub diagnostics: Vec<String>,
}

impl TypeSafetyMetrics {
    pub fn grade_input(&self) -> GradeInput {
        if !self.configured {
            return GradeInput::not_configured();
        }
        GradeInput::counts(self.total_errors, 0)
    }

    fn not_configured(source: &str, reason: &str) -> Self {
        let mut metrics = Self {
            status: Status::NotConfigured,
            configured: false,
            source: source.to_string(),
            total_errors: 0,
            total_warnings: 0,
            total_notes: 0,
            files_with_errors: 0,
            reported_total: None,
            modules: Vec::new(),
            error_codes: Vec::new(),
            errors: Vec::new(),
            unparsed_lines: 0,
            diagnostics: vec![reason.to_string()],
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeSafetyBuilder;

impl TypeSafetyBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> TypeSafetyMetrics {
        let mut errors = Vec::new();
        let mut total_warnings = 0;
        let mut total_notes = 0;
        let mut unparsed_lines = 0;
        let mut reported_total = None;
        let mut diagnostics = Vec::new();

        for line in raw.content.lines() {
            let trimmed = line.trim_end();
            if trimmed.trim().is_empty() {
                continue;
            }

            if let Some(caps) = DIAGNOSTIC_LINE.captures(trimmed) {
                match &caps["severity"] {
                    "error" => {
                        let path = caps["path"].trim().to_string();
                        let module = ctx.module_for(&path);
                        errors.push(TypeError {
                            line: caps["line"].parse().unwrap_or(0),
                            column: caps.name("col").and_then(|c| c.as_str().parse().ok()),
                            module,
                            code: caps
                                .name("code")
                                .map(|c| c.as_str().to_string())
                                .unwrap_or_else(|| UNCATEGORIZED_CODE.to_string()),
                            message: caps["message"].trim().to_string(),
                            path,
                        });
                    }
                    "warning" => total_warnings += 1,
                    _ => total_notes += 1,
                }
            } else if let Some(caps) = FOUND_SUMMARY.captures(trimmed.trim()) {
                reported_total = caps["errors"].parse().ok();
            } else if trimmed.trim_start().starts_with("Success:") {
                reported_total = Some(0);
            } else {
                unparsed_lines += 1;
            }
        }

        if let Some(reported) = reported_total {
            if reported != errors.len() {
                warn!(
                    "{}: checker reported {} errors but {} error lines were parsed",
                    raw.origin,
                    reported,
                    errors.len()
                );
                diagnostics.push(format!(
                    "checker summary reports {} errors, {} parsed",
                    reported,
                    errors.len()
                ));
            }
        }
        if unparsed_lines > 0 {
            debug!("{}: ignored {} unrecognised lines", raw.origin, unparsed_lines);
        }

        let modules = module_breakdown(&errors);
        let error_codes = code_breakdown(&errors);
        let files_with_errors = {
            let mut files: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
            files.sort_unstable();
            files.dedup();
            files.len()
        };

        let mut metrics = TypeSafetyMetrics {
            status: Status::NoData,
            configured: true,
            source: raw.origin.clone(),
            total_errors: errors.len(),
            total_warnings,
            total_notes,
            files_with_errors,
            reported_total,
            modules,
            error_codes,
            errors,
            unparsed_lines,
            diagnostics,
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

fn module_breakdown(errors: &[TypeError]) -> Vec<ModuleErrorCount> {
    let mut by_module: HashMap<&str, (usize, Vec<&str>)> = HashMap::new();
    for error in errors {
        let entry = by_module.entry(error.module.as_str()).or_default();
        entry.0 += 1;
        entry.1.push(error.path.as_str());
    }

    let mut modules: Vec<ModuleErrorCount> = by_module
        .into_iter()
        .map(|(module, (count, mut files))| {
            files.sort_unstable();
            files.dedup();
            ModuleErrorCount {
                module: module.to_string(),
                errors: count,
                files: files.len(),
            }
        })
        .collect();
    modules.sort_by(|a, b| b.errors.cmp(&a.errors).then_with(|| a.module.cmp(&b.module)));
    modules
}

fn code_breakdown(errors: &[TypeError]) -> Vec<ErrorCodeCount> {
    let mut by_code: HashMap<&str, usize> = HashMap::new();
    for error in errors {
        *by_code.entry(error.code.as_str()).or_default() += 1;
    }
    let mut codes: Vec<ErrorCodeCount> = by_code
        .into_iter()
        .map(|(code, count)| ErrorCodeCount {
            code: code.to_string(),
            count,
        })
        .collect();
    codes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    codes
}

impl DataBuilder for TypeSafetyBuilder {
    fn category(&self) -> Category {
        Category::TypeSafety
    }

    fn build(&self, raw: &RawSignal, ctx: &mut BuildContext<'_>) -> MetricRecord {
        MetricRecord::TypeSafety(self.parse(raw, ctx))
    }

    fn not_configured(&self, reason: &str) -> MetricRecord {
        MetricRecord::TypeSafety(TypeSafetyMetrics::not_configured("", reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SegmentResolver;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> TypeSafetyMetrics {
        let resolver = SegmentResolver::new("src", 1);
        let mut ctx = BuildContext::new(&resolver);
        let raw = RawSignal::new(Category::TypeSafety, "mypy.txt", text);
        TypeSafetyBuilder::new().parse(&raw, &mut ctx)
    }

    #[test]
    fn test_three_errors_across_two_modules() {
        let metrics = parse(indoc! {r#"
            src/shop/orders.py:10: error: Incompatible return value type (got "int", expected "str")  [return-value]
            src/shop/orders.py:22:5: error: Name "foo" is not defined  [name-defined]
            src/billing/invoice.py:3: error: Missing return statement  [return]
            src/billing/invoice.py:4: note: See https://mypy.rtfd.io
            Found 3 errors in 2 files (checked 14 source files)
        "#});

        assert_eq!(metrics.total_errors, 3);
        assert_eq!(metrics.total_notes, 1);
        assert_eq!(metrics.files_with_errors, 2);
        assert_eq!(metrics.reported_total, Some(3));
        assert_eq!(metrics.modules.iter().map(|m| m.errors).sum::<usize>(), 3);
        assert_eq!(metrics.modules[0].module, "shop");
        assert_eq!(metrics.modules[0].errors, 2);
        assert_eq!(metrics.status, Status::Fail);
        assert!(metrics.diagnostics.is_empty());
    }

    #[test]
    fn test_clean_run_is_pass() {
        let metrics = parse("Success: no issues found in 42 source files\n");
        assert_eq!(metrics.total_errors, 0);
        assert_eq!(metrics.reported_total, Some(0));
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let metrics = parse("src/a/x.py:1: warning: unused 'type: ignore' comment  [unused-ignore]\n");
        assert_eq!(metrics.total_errors, 0);
        assert_eq!(metrics.total_warnings, 1);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_error_codes_sorted_with_misc_fallback() {
        let metrics = parse(indoc! {r#"
            src/a/x.py:1: error: one  [arg-type]
            src/a/x.py:2: error: two  [arg-type]
            src/a/y.py:3: error: three without code
            src/b/z.py:4: error: four  [attr-defined]
        "#});
        let codes: Vec<(&str, usize)> = metrics
            .error_codes
            .iter()
            .map(|c| (c.code.as_str(), c.count))
            .collect();
        assert_eq!(codes, vec![("arg-type", 2), ("attr-defined", 1), ("misc", 1)]);
        assert_eq!(metrics.errors[2].message, "three without code");
    }

    #[test]
    fn test_garbage_never_panics() {
        let metrics = parse("::::\n\u{0}\nerror: error: error\n:12: error:\nTraceback (most recent call last):\n");
        assert_eq!(metrics.total_errors, 0);
        assert!(metrics.unparsed_lines >= 3);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_summary_mismatch_is_recorded() {
        let metrics = parse("src/a/x.py:1: error: one  [misc]\nFound 2 errors in 1 file\n");
        assert_eq!(metrics.total_errors, 1);
        assert_eq!(metrics.diagnostics.len(), 1);
    }

    #[test]
    fn test_non_ascii_preserved() {
        let metrics = parse("src/données/modèle.py:7: error: Argument « x » incompatible  [arg-type]\n");
        assert_eq!(metrics.errors[0].message, "Argument « x » incompatible");
        assert_eq!(metrics.errors[0].module, "données");
    }

    #[test]
    fn test_windows_drive_paths() {
        let metrics = parse(r"C:\work\src\app\main.py:5:1: error: Bad  [misc]");
        assert_eq!(metrics.total_errors, 1);
        assert_eq!(metrics.errors[0].path, r"C:\work\src\app\main.py");
        assert_eq!(metrics.errors[0].module, "app");
    }

    #[test]
    fn test_not_configured_record() {
        let record = TypeSafetyBuilder::new().not_configured("no signal");
        assert_eq!(record.status(), Status::NotConfigured);
    }

    #[test]
    fn test_large_input() {
        let text: String = (0..1500)
            .map(|i| format!("src/m{}/f.py:{}: error: e{}  [c{}]\n", i % 37, i, i, i % 5))
            .collect();
        let metrics = parse(&text);
        assert_eq!(metrics.total_errors, 1500);
        assert_eq!(metrics.modules.len(), 37);
        assert_eq!(metrics.error_codes.len(), 5);
    }
}
