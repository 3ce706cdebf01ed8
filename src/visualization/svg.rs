//! Static SVG bar charts.

use super::{ChartArtifact, VisualizationProvider};
use crate::builders::{
    ArchitectureMetrics, ComplexityMetrics, PackageMetrics, TestRunMetrics, TypeSafetyMetrics,
};
use crate::core::Category;
use crate::errors::Result;
use crate::graph::GraphMetrics;
use html_escape::encode_text;
use std::fmt::Write;
use std::path::Path;
use tracing::debug;

const PASS_COLOR: &str = "#2e7d32";
const WARN_COLOR: &str = "#f9a825";
const FAIL_COLOR: &str = "#c62828";
const NEUTRAL_COLOR: &str = "#1565c0";
const MUTED_COLOR: &str = "#9e9e9e";

const WIDTH: u32 = 640;
const BAR_HEIGHT: u32 = 22;
const BAR_GAP: u32 = 8;
const LABEL_WIDTH: u32 = 220;
const TOP: u32 = 44;
const MAX_LABEL_CHARS: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: &'static str,
}

impl Bar {
    pub fn new(label: impl Into<String>, value: impl Into<f64>, color: &'static str) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            color,
        }
    }
}

/// Horizontal bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<Bar>,
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut short: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    short.push('…');
    short
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

impl BarChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bars: Vec::new(),
        }
    }

    pub fn bar(mut self, label: impl Into<String>, value: impl Into<f64>, color: &'static str) -> Self {
        self.bars.push(Bar::new(label, value, color));
        self
    }

    pub fn bars(mut self, bars: impl IntoIterator<Item = Bar>) -> Self {
        self.bars.extend(bars);
        self
    }

    /// True when there is nothing worth drawing
    pub fn is_empty(&self) -> bool {
        self.bars.iter().all(|b| b.value <= 0.0 || !b.value.is_finite())
    }

    pub fn render(&self) -> String {
        let title = encode_text(&self.title);
        if self.is_empty() {
            return format!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"120\" viewBox=\"0 0 {WIDTH} 120\">\n\
                 <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n\
                 <text x=\"16\" y=\"28\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"16\" font-weight=\"bold\">{title}</text>\n\
                 <text x=\"{}\" y=\"80\" text-anchor=\"middle\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"14\" fill=\"{MUTED_COLOR}\">No data</text>\n\
                 </svg>\n",
                WIDTH / 2
            );
        }

        let max = self
            .bars
            .iter()
            .map(|b| b.value)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let plot_width = f64::from(WIDTH - LABEL_WIDTH - 70);
        let rows = self.bars.len() as u32;
        let height = TOP + rows * (BAR_HEIGHT + BAR_GAP) + 16;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\" viewBox=\"0 0 {WIDTH} {height}\">"
        );
        let _ = writeln!(svg, "<rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>");
        let _ = writeln!(
            svg,
            "<text x=\"16\" y=\"28\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"16\" font-weight=\"bold\">{title}</text>"
        );

        for (i, bar) in self.bars.iter().enumerate() {
            let y = TOP + i as u32 * (BAR_HEIGHT + BAR_GAP);
            let value = if bar.value.is_finite() { bar.value.max(0.0) } else { 0.0 };
            let width = if max > 0.0 { value / max * plot_width } else { 0.0 };
            let _ = writeln!(
                svg,
                "<text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\">{}</text>",
                LABEL_WIDTH - 8,
                y + BAR_HEIGHT / 2 + 4,
                encode_text(&truncate_label(&bar.label))
            );
            let _ = writeln!(
                svg,
                "<rect x=\"{LABEL_WIDTH}\" y=\"{y}\" width=\"{width:.1}\" height=\"{BAR_HEIGHT}\" fill=\"{}\"/>",
                bar.color
            );
            let _ = writeln!(
                svg,
                "<text x=\"{:.1}\" y=\"{}\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\">{}</text>",
                f64::from(LABEL_WIDTH) + width + 6.0,
                y + BAR_HEIGHT / 2 + 4,
                format_value(value)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

/// Default provider writing SVG bar charts.
#[derive(Debug, Clone, Default)]
pub struct SvgChartProvider;

impl SvgChartProvider {
    pub fn new() -> Self {
        Self
    }

    fn write(
        &self,
        category: Category,
        name: &str,
        chart: &BarChart,
        dir: &Path,
    ) -> Result<ChartArtifact> {
        let path = dir.join(ChartArtifact::file_name(category, name));
        crate::io::write_file(&path, &chart.render())?;
        debug!("wrote chart {}", path.display());
        Ok(ChartArtifact {
            category,
            name: name.to_string(),
            path,
        })
    }

    fn write_all(
        &self,
        category: Category,
        charts: &[(&str, BarChart)],
        dir: &Path,
    ) -> Result<Vec<ChartArtifact>> {
        charts
            .iter()
            .map(|(name, chart)| self.write(category, name, chart, dir))
            .collect()
    }

    fn test_run(
        &self,
        category: Category,
        metrics: &TestRunMetrics,
        dir: &Path,
    ) -> Result<Vec<ChartArtifact>> {
        let outcomes = BarChart::new(format!("{} outcomes", category.title()))
            .bar("passed", metrics.passed as f64, PASS_COLOR)
            .bar("failed", metrics.failed as f64, FAIL_COLOR)
            .bar("skipped", metrics.skipped as f64, MUTED_COLOR);
        let slowest = BarChart::new("Slowest tests (seconds)").bars(
            metrics
                .slowest
                .iter()
                .map(|t| Bar::new(t.nodeid.clone(), t.duration_seconds, NEUTRAL_COLOR)),
        );
        self.write_all(category, &[("outcomes", outcomes), ("slowest", slowest)], dir)
    }
}

impl VisualizationProvider for SvgChartProvider {
    fn type_safety(&self, metrics: &TypeSafetyMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        let by_module = BarChart::new("Type errors by module").bars(
            metrics
                .modules
                .iter()
                .take(15)
                .map(|m| Bar::new(m.module.clone(), m.errors as f64, FAIL_COLOR)),
        );
        let by_code = BarChart::new("Type errors by code").bars(
            metrics
                .error_codes
                .iter()
                .take(15)
                .map(|c| Bar::new(c.code.clone(), c.count as f64, WARN_COLOR)),
        );
        self.write_all(
            Category::TypeSafety,
            &[("errors_by_module", by_module), ("errors_by_code", by_code)],
            dir,
        )
    }

    fn complexity(&self, metrics: &ComplexityMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        let offenders = BarChart::new(format!("Most complex functions (threshold {})", metrics.threshold))
            .bars(metrics.top_offenders.iter().map(|v| {
                Bar::new(
                    format!("{}.{}", v.module, v.function),
                    f64::from(v.score),
                    WARN_COLOR,
                )
            }));
        let by_module = BarChart::new("Violations by module").bars(
            metrics
                .modules
                .iter()
                .take(15)
                .map(|m| Bar::new(m.module.clone(), m.violations as f64, WARN_COLOR)),
        );
        self.write_all(
            Category::Complexity,
            &[("top_offenders", offenders), ("violations_by_module", by_module)],
            dir,
        )
    }

    fn architecture(&self, metrics: &ArchitectureMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        let contracts = BarChart::new("Architecture contracts")
            .bar("kept", metrics.kept as f64, PASS_COLOR)
            .bar("broken", metrics.broken as f64, FAIL_COLOR);
        self.write_all(Category::Architecture, &[("contracts", contracts)], dir)
    }

    fn packages(&self, metrics: &PackageMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        let inventory = BarChart::new("Package inventory")
            .bar("installed", metrics.total_installed as f64, NEUTRAL_COLOR)
            .bar("outdated", metrics.outdated.len() as f64, WARN_COLOR)
            .bar("vulnerable", metrics.vulnerable_packages as f64, FAIL_COLOR);
        let health_color = if metrics.vulnerabilities.is_empty() {
            PASS_COLOR
        } else {
            FAIL_COLOR
        };
        let health = BarChart::new("Package health score").bar("health", metrics.health_score, health_color);
        self.write_all(
            Category::Packages,
            &[("inventory", inventory), ("health", health)],
            dir,
        )
    }

    fn unit_tests(&self, metrics: &TestRunMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        self.test_run(Category::UnitTests, metrics, dir)
    }

    fn e2e_tests(&self, metrics: &TestRunMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        self.test_run(Category::E2eTests, metrics, dir)
    }

    fn dependencies(&self, metrics: &GraphMetrics, dir: &Path) -> Result<Vec<ChartArtifact>> {
        let fan_in = BarChart::new("Most imported modules").bars(
            metrics
                .fan_in
                .iter()
                .map(|c| Bar::new(c.module.clone(), c.count as f64, NEUTRAL_COLOR)),
        );
        let fan_out = BarChart::new("Most dependent modules").bars(
            metrics
                .fan_out
                .iter()
                .map(|c| Bar::new(c.module.clone(), c.count as f64, NEUTRAL_COLOR)),
        );
        self.write_all(
            Category::Dependencies,
            &[("fan_in", fan_in), ("fan_out", fan_out)],
            dir,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{DataBuilder, TestRunBuilder};
    use crate::config::TestReportSettings;
    use crate::core::MetricRecord;
    use crate::visualization::VisualizationProvider;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_labels_are_escaped() {
        let svg = BarChart::new("<script>")
            .bar("a&b", 3.0, PASS_COLOR)
            .render();
        assert!(svg.contains("&lt;script&gt;"));
        assert!(svg.contains("a&amp;b"));
        assert!(!svg.contains("<script>"));
    }

    #[test]
    fn test_empty_chart_is_placeholder() {
        let svg = BarChart::new("Nothing").bar("zero", 0.0, PASS_COLOR).render();
        assert!(svg.contains("No data"));
        assert!(!svg.contains("<rect x="));
    }

    #[test]
    fn test_long_labels_truncated() {
        let label = "a".repeat(80);
        assert_eq!(truncate_label(&label).chars().count(), MAX_LABEL_CHARS);
    }

    #[test]
    fn test_empty_record_gets_placeholder_files_that_overwrite() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("assets/images");
        let record: MetricRecord =
            TestRunBuilder::unit(TestReportSettings::default()).not_configured("no report");

        let first = SvgChartProvider::new().generate(&record, &images).unwrap();
        let second = SvgChartProvider::new().generate(&record, &images).unwrap();

        assert_eq!(first, second);
        let names: Vec<&str> = first.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["outcomes", "slowest"]);
        assert_eq!(fs::read_dir(&images).unwrap().count(), 2);
        assert!(fs::read_to_string(&first[0].path).unwrap().contains("No data"));
        assert!(first[0].path.ends_with("unit_tests_outcomes.svg"));
    }
}
