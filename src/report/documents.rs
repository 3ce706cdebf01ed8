//! Template data for category detail documents.

use super::layout::relative_link;
use crate::builders::{
    ArchitectureMetrics, ComplexityMetrics, PackageMetrics, TestRunMetrics, TypeSafetyMetrics,
};
use crate::core::MetricRecord;
use crate::grading::GradeResult;
use crate::graph::GraphMetrics;
use crate::template::TemplateData;
use crate::visualization::ChartArtifact;
use std::path::{Path, PathBuf};

/// Longest detail list rendered inline; the JSON data file has the rest.
const MAX_LISTED: usize = 50;

const NONE: &str = "_None._";

/// Run-level values shared by every document.
pub struct DocumentContext<'a> {
    pub project: &'a str,
    pub generated_at: &'a str,
    pub document: &'a Path,
    pub data_file: &'a Path,
    pub dot_file: Option<PathBuf>,
    pub charts: &'a [ChartArtifact],
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// Markdown table, or a placeholder line when there are no rows.
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return NONE.to_string();
    }
    let mut out = format!("| {} |\n", headers.join(" | "));
    out.push_str(&format!(
        "|{}\n",
        headers.iter().map(|_| "---|").collect::<String>()
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.truncate(out.trim_end().len());
    out
}

fn bullet_list<I: IntoIterator<Item = String>>(items: I) -> String {
    let lines: Vec<String> = items.into_iter().map(|item| format!("- {item}")).collect();
    if lines.is_empty() {
        NONE.to_string()
    } else {
        lines.join("\n")
    }
}

fn truncation_note(total: usize) -> String {
    if total > MAX_LISTED {
        format!("\n\n_Showing {MAX_LISTED} of {total}; see the data file for the full list._")
    } else {
        String::new()
    }
}

fn chart_links(ctx: &DocumentContext<'_>) -> String {
    ctx.charts
        .iter()
        .map(|chart| {
            format!(
                "![{}]({})",
                chart.name.replace('_', " "),
                relative_link(ctx.document, &chart.path)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn diagnostics_section(diagnostics: &[String]) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }
    format!("## Notes\n\n{}", bullet_list(diagnostics.iter().cloned()))
}

fn score_text(score: Option<f64>) -> String {
    score.map(|s| format!("{s:.1}")).unwrap_or_else(|| "-".to_string())
}

/// Values every detail template may use.
fn common(record: &MetricRecord, grade: &GradeResult, ctx: &DocumentContext<'_>) -> TemplateData {
    let category = record.category();
    let mut data = TemplateData::new();
    data.set("title", category.title())
        .set("category", category.as_str())
        .set("project", ctx.project)
        .set("generated_at", ctx.generated_at)
        .set("status", grade.status.label())
        .set("grade", &grade.grade)
        .set("emoji", &grade.emoji)
        .set("badge", grade.badge())
        .set("score", score_text(grade.score))
        .set("color", &grade.color)
        .set("charts", chart_links(ctx))
        .set("data_file", relative_link(ctx.document, ctx.data_file))
        .set("diagnostics", diagnostics_section(record.diagnostics()));
    data
}

pub fn detail_data(
    record: &MetricRecord,
    grade: &GradeResult,
    ctx: &DocumentContext<'_>,
) -> TemplateData {
    let mut data = common(record, grade, ctx);
    match record {
        MetricRecord::TypeSafety(m) => type_safety(m, &mut data),
        MetricRecord::Complexity(m) => complexity(m, &mut data),
        MetricRecord::Architecture(m) => architecture(m, &mut data),
        MetricRecord::Packages(m) => packages(m, &mut data),
        MetricRecord::UnitTests(m) | MetricRecord::E2eTests(m) => test_run(m, &mut data),
        MetricRecord::Dependencies(m) => {
            let dot = ctx
                .dot_file
                .as_deref()
                .map(|path| relative_link(ctx.document, path))
                .unwrap_or_default();
            data.set("dot_file", dot);
            dependencies(m, &mut data)
        }
    }
    data
}

fn type_safety(m: &TypeSafetyMetrics, data: &mut TemplateData) {
    let modules: Vec<Vec<String>> = m
        .modules
        .iter()
        .map(|row| vec![row.module.clone(), row.errors.to_string(), row.files.to_string()])
        .collect();
    let codes: Vec<Vec<String>> = m
        .error_codes
        .iter()
        .map(|row| vec![format!("`{}`", row.code), row.count.to_string()])
        .collect();
    let errors: Vec<Vec<String>> = m
        .errors
        .iter()
        .take(MAX_LISTED)
        .map(|e| {
            vec![
                format!("{}:{}", e.path, e.line),
                e.module.clone(),
                format!("`{}`", e.code),
                e.message.clone(),
            ]
        })
        .collect();

    data.set("total_errors", m.total_errors)
        .set("total_warnings", m.total_warnings)
        .set("total_notes", m.total_notes)
        .set("files_with_errors", m.files_with_errors)
        .set("module_table", markdown_table(&["Module", "Errors", "Files"], &modules))
        .set("code_table", markdown_table(&["Code", "Count"], &codes))
        .set(
            "error_list",
            markdown_table(&["Location", "Module", "Code", "Message"], &errors)
                + &truncation_note(m.errors.len()),
        );
}

fn complexity(m: &ComplexityMetrics, data: &mut TemplateData) {
    let offenders: Vec<Vec<String>> = m
        .top_offenders
        .iter()
        .map(|v| {
            vec![
                format!("`{}`", v.function),
                v.module.clone(),
                format!("{}:{}", v.path, v.line),
                v.score.to_string(),
            ]
        })
        .collect();
    let modules: Vec<Vec<String>> = m
        .modules
        .iter()
        .map(|row| vec![row.module.clone(), row.violations.to_string(), row.max_score.to_string()])
        .collect();

    data.set("threshold", m.threshold)
        .set("total_violations", m.total_violations)
        .set("max_score", m.max_score)
        .set("average_score", format!("{:.1}", m.average_score))
        .set(
            "offender_table",
            markdown_table(&["Function", "Module", "Location", "Score"], &offenders),
        )
        .set(
            "module_table",
            markdown_table(&["Module", "Violations", "Max score"], &modules),
        );
}

fn architecture(m: &ArchitectureMetrics, data: &mut TemplateData) {
    let contracts: Vec<Vec<String>> = m
        .contracts
        .iter()
        .map(|c| {
            let state = if c.kept { "✅ kept" } else { "❌ broken" };
            vec![c.name.clone(), state.to_string()]
        })
        .collect();
    let details: Vec<String> = m
        .contracts
        .iter()
        .filter(|c| !c.kept)
        .map(|c| {
            let lines = if c.violations.is_empty() {
                NONE.to_string()
            } else {
                bullet_list(c.violations.iter().cloned())
            };
            format!("### {}\n\n{}", c.name, lines)
        })
        .collect();

    data.set("kept", m.kept)
        .set("broken", m.broken)
        .set("total", m.total)
        .set("compliance_rate", format!("{:.1}", m.compliance_rate))
        .set("contract_table", markdown_table(&["Contract", "State"], &contracts))
        .set(
            "violation_details",
            if details.is_empty() {
                NONE.to_string()
            } else {
                details.join("\n\n")
            },
        );
}

fn packages(m: &PackageMetrics, data: &mut TemplateData) {
    let vulnerabilities: Vec<Vec<String>> = m
        .vulnerabilities
        .iter()
        .take(MAX_LISTED)
        .map(|v| {
            let fix = if v.fix_versions.is_empty() {
                "-".to_string()
            } else {
                v.fix_versions.join(", ")
            };
            vec![
                v.package.clone(),
                v.version.clone(),
                v.id.clone(),
                fix,
                v.description.clone(),
            ]
        })
        .collect();
    let outdated: Vec<Vec<String>> = m
        .outdated
        .iter()
        .take(MAX_LISTED)
        .map(|p| vec![p.name.clone(), p.current.clone(), p.latest.clone()])
        .collect();

    data.set("total_installed", m.total_installed)
        .set("outdated_count", m.outdated.len())
        .set("vulnerability_count", m.vulnerabilities.len())
        .set("vulnerable_packages", m.vulnerable_packages)
        .set("health_score", format!("{:.1}", m.health_score))
        .set(
            "vulnerability_table",
            markdown_table(
                &["Package", "Version", "Advisory", "Fixed in", "Description"],
                &vulnerabilities,
            ) + &truncation_note(m.vulnerabilities.len()),
        )
        .set(
            "outdated_table",
            markdown_table(&["Package", "Installed", "Latest"], &outdated)
                + &truncation_note(m.outdated.len()),
        );
}

fn test_run(m: &TestRunMetrics, data: &mut TemplateData) {
    let failures: Vec<Vec<String>> = m
        .failures
        .iter()
        .take(MAX_LISTED)
        .map(|f| vec![format!("`{}`", f.nodeid), f.module.clone(), f.message.clone()])
        .collect();
    let slowest: Vec<Vec<String>> = m
        .slowest
        .iter()
        .map(|t| vec![format!("`{}`", t.nodeid), format!("{:.3}", t.duration_seconds)])
        .collect();
    let modules: Vec<Vec<String>> = m
        .modules
        .iter()
        .map(|row| vec![row.module.clone(), row.passed.to_string(), row.failed.to_string()])
        .collect();

    data.set("total", m.total)
        .set("passed", m.passed)
        .set("failed", m.failed)
        .set("skipped", m.skipped)
        .set("pass_rate", format!("{:.1}", m.pass_rate))
        .set("duration_seconds", format!("{:.2}", m.duration_seconds))
        .set(
            "failure_table",
            markdown_table(&["Test", "Module", "Message"], &failures)
                + &truncation_note(m.failures.len()),
        )
        .set("slowest_table", markdown_table(&["Test", "Seconds"], &slowest))
        .set("module_table", markdown_table(&["Module", "Passed", "Failed"], &modules));
}

fn dependencies(m: &GraphMetrics, data: &mut TemplateData) {
    let fan_in: Vec<Vec<String>> = m
        .fan_in
        .iter()
        .map(|c| vec![c.module.clone(), c.count.to_string()])
        .collect();
    let fan_out: Vec<Vec<String>> = m
        .fan_out
        .iter()
        .map(|c| vec![c.module.clone(), c.count.to_string()])
        .collect();

    data.set("module_count", m.module_count)
        .set("edge_count", m.edge_count)
        .set("total_imports", m.total_imports)
        .set("average_fan_out", format!("{:.1}", m.average_fan_out))
        .set("cycle_count", m.cycles.len())
        .set(
            "cycle_list",
            bullet_list(m.cycles.iter().map(|cycle| cycle.join(" ↔ "))),
        )
        .set("isolated_count", m.isolated.len())
        .set("max_isolated", m.max_isolated)
        .set(
            "isolated_list",
            bullet_list(m.isolated.iter().map(|module| format!("`{module}`"))),
        )
        .set("fan_in_table", markdown_table(&["Module", "Imported by"], &fan_in))
        .set("fan_out_table", markdown_table(&["Module", "Imports"], &fan_out))
        .set(
            "skipped_files",
            bullet_list(m.skipped_files.iter().map(|f| format!("`{f}`"))),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{DataBuilder, PackageBuilder};
    use crate::config::PackagePenalties;
    use crate::core::{BuildContext, Category, RawSignal, SegmentResolver};
    use crate::grading::grade;
    use crate::template::TemplateEngine;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markdown_table_escapes_pipes() {
        let table = markdown_table(&["A", "B"], &[vec!["x|y".into(), "multi\nline".into()]]);
        assert_eq!(table, "| A | B |\n|---|---|\n| x\\|y | multi line |");
        assert_eq!(markdown_table(&["A"], &[]), NONE);
    }

    #[test]
    fn test_every_builtin_template_renders_its_record() {
        let resolver = SegmentResolver::new("src", 1);
        let penalties = PackagePenalties::default();
        let samples = vec![
            PackageBuilder::new(penalties.clone()).not_configured("absent"),
            PackageBuilder::new(penalties).build(
                &RawSignal::new(Category::Packages, "p.json", r#"{"installed": []}"#),
                &mut BuildContext::new(&resolver),
            ),
        ];
        let config = crate::config::QualitymapConfig::default();
        let mut records = samples;
        for category in Category::ALL {
            if let Some(builder) = crate::builders::builder_for(category, &config) {
                records.push(builder.not_configured("absent"));
            }
        }
        records.push(MetricRecord::Dependencies(GraphMetrics::not_configured("/src", "absent")));

        let engine = TemplateEngine::builtin();
        for record in &records {
            let document = PathBuf::from("/out/details/x.md");
            let data_file = PathBuf::from("/out/assets/data/x.json");
            let ctx = DocumentContext {
                project: "demo",
                generated_at: "2024-01-01 00:00 UTC",
                document: &document,
                data_file: &data_file,
                dot_file: Some(PathBuf::from("/out/assets/data/dependencies.dot")),
                charts: &[],
            };
            let data = detail_data(record, &grade(record), &ctx);
            let name = format!("{}.md", record.category().as_str());
            let text = engine.render(&name, &data).unwrap();
            assert!(text.contains(record.category().title()));
        }
    }
}
