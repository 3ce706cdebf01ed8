//! Grading engine.
//!
//! One decision table turns a record's metrics into a [`Status`], and one
//! table turns a status into its letter, emoji and color. Builders call
//! [`decide`] instead of judging their own counts, so the rule that zero
//! findings is always the best outcome lives in exactly one place.

use crate::core::{Category, MetricRecord, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric summary a record hands to the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradeInput {
    /// False when the check's prerequisite configuration was absent
    pub configured: bool,
    /// False when the check ran over an empty input set
    pub has_data: bool,
    /// Findings that fail the category on their own (errors, cycles, vulnerabilities)
    pub blocking: usize,
    /// Findings that only warrant attention (outdated packages, isolated modules)
    pub advisory: usize,
    /// Advisory findings tolerated before the category warns
    pub advisory_allowance: usize,
    /// Category score on a 0-100 scale, where one applies
    pub score: Option<f64>,
}

impl GradeInput {
    pub fn counts(blocking: usize, advisory: usize) -> Self {
        Self {
            configured: true,
            has_data: true,
            blocking,
            advisory,
            ..Default::default()
        }
    }

    pub fn not_configured() -> Self {
        Self {
            configured: false,
            has_data: false,
            ..Default::default()
        }
    }

    pub fn no_data() -> Self {
        Self {
            configured: true,
            has_data: false,
            ..Default::default()
        }
    }

    pub fn with_allowance(mut self, allowance: usize) -> Self {
        self.advisory_allowance = allowance;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// The decision table.
pub fn decide(input: &GradeInput) -> Status {
    if !input.configured {
        return Status::NotConfigured;
    }
    if !input.has_data {
        return Status::NoData;
    }
    if input.blocking == 0 && input.advisory == 0 {
        return Status::Pass;
    }
    if input.blocking > 0 {
        return Status::Fail;
    }
    if input.advisory > input.advisory_allowance {
        Status::Warn
    } else {
        Status::Pass
    }
}

/// Display attributes attached to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeRule {
    pub status: Status,
    pub letter: &'static str,
    pub emoji: &'static str,
    pub color: &'static str,
}

const GRADE_TABLE: [GradeRule; 5] = [
    GradeRule {
        status: Status::Pass,
        letter: "A",
        emoji: "✅",
        color: "#2e7d32",
    },
    GradeRule {
        status: Status::Warn,
        letter: "C",
        emoji: "⚠️",
        color: "#f9a825",
    },
    GradeRule {
        status: Status::Fail,
        letter: "F",
        emoji: "❌",
        color: "#c62828",
    },
    GradeRule {
        status: Status::NotConfigured,
        letter: "N/A",
        emoji: "⚙️",
        color: "#757575",
    },
    GradeRule {
        status: Status::NoData,
        letter: "N/A",
        emoji: "➖",
        color: "#9e9e9e",
    },
];

pub fn rule_for(status: Status) -> GradeRule {
    GRADE_TABLE
        .iter()
        .copied()
        .find(|rule| rule.status == status)
        .unwrap_or(GRADE_TABLE[4])
}

/// Graded outcome of one category. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub category: Category,
    pub status: Status,
    pub grade: String,
    pub emoji: String,
    pub score: Option<f64>,
    pub color: String,
}

impl GradeResult {
    pub fn from_input(category: Category, input: &GradeInput) -> Self {
        let status = decide(input);
        let rule = rule_for(status);
        Self {
            category,
            status,
            grade: rule.letter.to_string(),
            emoji: rule.emoji.to_string(),
            score: input.score,
            color: rule.color.to_string(),
        }
    }

    /// `"✅ A"` style badge for documents
    pub fn badge(&self) -> String {
        format!("{} {}", self.emoji, self.grade)
    }
}

/// Grade a record.
pub fn grade(record: &MetricRecord) -> GradeResult {
    GradeResult::from_input(record.category(), &record.grade_input())
}

/// Status across all graded categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Pass,
    NeedsAttention,
    Fail,
}

impl OverallStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OverallStatus::Pass => "Pass",
            OverallStatus::NeedsAttention => "Needs attention",
            OverallStatus::Fail => "Fail",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OverallStatus::Pass => "✅",
            OverallStatus::NeedsAttention => "⚠️",
            OverallStatus::Fail => "❌",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OverallStatus::Fail)
    }

    /// A run with failed pipelines is never better than needs-attention.
    pub fn with_pipeline_errors(self, errors: usize) -> Self {
        match self {
            OverallStatus::Pass if errors > 0 => OverallStatus::NeedsAttention,
            other => other,
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fold category statuses by severity rank. Input order does not matter.
pub fn aggregate<'a, I>(grades: I) -> OverallStatus
where
    I: IntoIterator<Item = &'a GradeResult>,
{
    let worst = grades
        .into_iter()
        .map(|g| g.status)
        .max_by_key(Status::severity_rank);

    match worst {
        Some(Status::Fail) => OverallStatus::Fail,
        Some(Status::Warn) => OverallStatus::NeedsAttention,
        _ => OverallStatus::Pass,
    }
}
