//! Terminal rendering of a finished run.

use crate::core::{Category, Status};
use crate::grading::OverallStatus;
use crate::report::RunSummary;
use colored::*;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use std::env;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,   // Detect based on terminal
    Always, // Force colors on
    Never,  // Force colors off
}

impl ColorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn should_use_color(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => detect_color_support(),
        }
    }

    /// Apply the environment conventions on top of the requested mode.
    pub fn from_env(requested: ColorMode) -> Self {
        // NO_COLOR per no-color.org
        if env::var_os("NO_COLOR").is_some() {
            return Self::Never;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v == "1") {
            return Self::Always;
        }
        if requested == Self::Auto && env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return Self::Never;
        }
        requested
    }

    /// Make the `colored` crate follow this mode process-wide.
    pub fn apply(&self) {
        colored::control::set_override(self.should_use_color());
    }
}

fn detect_color_support() -> bool {
    if env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn paint_status(label: &str, status: Status, color: bool) -> String {
    if !color {
        return label.to_string();
    }
    match status {
        Status::Pass => label.green().to_string(),
        Status::Warn => label.yellow().to_string(),
        Status::Fail => label.red().bold().to_string(),
        Status::NotConfigured | Status::NoData => label.dimmed().to_string(),
    }
}

fn paint_overall(overall: OverallStatus, color: bool) -> String {
    let text = format!("Overall: {}", overall.label());
    if !color {
        return text;
    }
    match overall {
        OverallStatus::Pass => text.green().bold().to_string(),
        OverallStatus::NeedsAttention => text.yellow().bold().to_string(),
        OverallStatus::Fail => text.red().bold().to_string(),
    }
}

/// Table of every category followed by the overall status line.
pub fn render_summary_table(summary: &RunSummary, color: bool) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Category", "Status", "Grade", "Score"]);

    for category in Category::ALL {
        let row = if let Some(outcome) = summary.outcome(category) {
            let g = &outcome.grade;
            vec![
                category.title().to_string(),
                paint_status(g.status.label(), g.status, color),
                g.badge(),
                g.score
                    .map(|s| format!("{s:.1}"))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        } else if summary.errors.iter().any(|e| e.category == category) {
            let label = if color {
                "Error".red().to_string()
            } else {
                "Error".to_string()
            };
            vec![category.title().to_string(), label, "-".into(), "-".into()]
        } else {
            vec![
                category.title().to_string(),
                "N/A".to_string(),
                "N/A".to_string(),
                "-".to_string(),
            ]
        };
        table.add_row(row);
    }

    let mut out = table.to_string();
    out.push('\n');
    for error in &summary.errors {
        out.push_str(&format!("{}: {}\n", error.category.title(), error.message));
    }
    out.push_str(&paint_overall(summary.overall, color));
    out.push('\n');
    out.push_str(&format!("Report: {}\n", summary.document.path.display()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualitymapConfig;
    use crate::report::{InMemorySignals, ReportOrchestrator, ReportRequest};

    #[test]
    fn test_color_mode_parse() {
        assert_eq!(ColorMode::parse("ALWAYS"), Some(ColorMode::Always));
        assert_eq!(ColorMode::parse("nope"), None);
        assert!(!ColorMode::Never.should_use_color());
    }

    #[test]
    fn test_plain_table_lists_every_category() {
        let dir = tempfile::TempDir::new().unwrap();
        let signals = InMemorySignals::new().with(
            Category::TypeSafety,
            "src/app/a.py:1: error: Bad  [misc]\n",
        );
        let request = ReportRequest::new("demo", dir.path(), dir.path().join("out"))
            .with_categories(vec![Category::TypeSafety]);
        let summary = ReportOrchestrator::new(QualitymapConfig::default(), Box::new(signals))
            .run(&request)
            .unwrap();

        let text = render_summary_table(&summary, false);
        for category in Category::ALL {
            assert!(text.contains(category.title()), "missing {category}");
        }
        assert!(text.contains("Overall: Fail"));
        assert!(!text.contains('\u{1b}'));
    }
}
