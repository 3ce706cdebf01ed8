//! Architecture contract linter output (import-linter style).
//!
//! ```text
//! Layered architecture KEPT
//! Domain independence BROKEN
//!
//! Contracts: 1 kept, 1 broken.
//!
//! ----------------
//! Broken contracts
//! ----------------
//!
//! Domain independence
//! -------------------
//!
//! shop.domain is not allowed to import shop.infra:
//!
//! - shop.domain.models -> shop.infra.db (l.3)
//! ```
//!
//! No contracts at all means the check is not configured, which is not the
//! same thing as compliance.

use super::{percentage, DataBuilder};
use crate::core::{BuildContext, Category, MetricRecord, RawSignal, Status};
use crate::grading::{decide, GradeInput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static CONTRACT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>\S.*?)\s+(?P<state>KEPT|BROKEN)$").expect("contract pattern is valid")
});

static ANALYZED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Analyzed (?P<files>\d+) files?, (?P<deps>\d+) dependenc")
        .expect("analyzed pattern is valid")
});

const MISSING_CONFIG_MARKERS: &[&str] = &[
    "could not find",
    "could not read any configuration",
    "no contracts",
    "no configuration",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    pub kept: bool,
    /// Detail lines printed for a broken contract
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureMetrics {
    pub status: Status,
    pub configured: bool,
    pub source: String,
    pub contracts: Vec<Contract>,
    pub kept: usize,
    pub broken: usize,
    pub total: usize,
    /// Kept contracts as a percentage of all contracts
    pub compliance_rate: f64,
    pub analyzed_files: Option<usize>,
    pub analyzed_dependencies: Option<usize>,
    pub diagnostics: Vec<String>,
}

impl ArchitectureMetrics {
    pub fn grade_input(&self) -> GradeInput {
        if !self.configured {
            return GradeInput::not_configured();
        }
        GradeInput::counts(self.broken, 0).with_score(self.compliance_rate)
    }

    fn not_configured(source: &str, reason: &str) -> Self {
        let mut metrics = Self {
            status: Status::NotConfigured,
            configured: false,
            source: source.to_string(),
            contracts: Vec::new(),
            kept: 0,
            broken: 0,
            total: 0,
            compliance_rate: 0.0,
            analyzed_files: None,
            analyzed_dependencies: None,
            diagnostics: vec![reason.to_string()],
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchitectureBuilder;

fn is_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-' || c == '=')
}

impl ArchitectureBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &RawSignal) -> ArchitectureMetrics {
        if raw.is_blank() {
            return ArchitectureMetrics::not_configured(&raw.origin, "contract linter produced no output");
        }
        let lowered = raw.content.to_lowercase();
        if let Some(marker) = MISSING_CONFIG_MARKERS.iter().find(|m| lowered.contains(*m)) {
            debug!("{}: contract configuration missing ({})", raw.origin, marker);
            return ArchitectureMetrics::not_configured(&raw.origin, "no contract configuration found");
        }

        let lines: Vec<&str> = raw.content.lines().map(str::trim_end).collect();
        let broken_section = lines
            .iter()
            .position(|line| line.trim().eq_ignore_ascii_case("broken contracts"));
        let listing_end = broken_section.unwrap_or(lines.len());

        let mut contracts: Vec<Contract> = Vec::new();
        let mut analyzed_files = None;
        let mut analyzed_dependencies = None;

        for line in &lines[..listing_end] {
            let trimmed = line.trim();
            if let Some(caps) = CONTRACT_LINE.captures(trimmed) {
                contracts.push(Contract {
                    name: caps["name"].to_string(),
                    kept: &caps["state"] == "KEPT",
                    violations: Vec::new(),
                });
            } else if let Some(caps) = ANALYZED_LINE.captures(trimmed) {
                analyzed_files = caps["files"].parse().ok();
                analyzed_dependencies = caps["deps"].parse().ok();
            }
        }

        let mut diagnostics = Vec::new();
        if let Some(start) = broken_section {
            attach_violations(&lines[start + 1..], &mut contracts, &mut diagnostics);
        }

        if contracts.is_empty() {
            return ArchitectureMetrics::not_configured(&raw.origin, "no contracts found in linter output");
        }

        let kept = contracts.iter().filter(|c| c.kept).count();
        let total = contracts.len();
        let mut metrics = ArchitectureMetrics {
            status: Status::NoData,
            configured: true,
            source: raw.origin.clone(),
            kept,
            broken: total - kept,
            total,
            compliance_rate: percentage(kept, total),
            contracts,
            analyzed_files,
            analyzed_dependencies,
            diagnostics,
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

/// Walk the broken-contracts section: a header line underlined with dashes
/// starts a contract, everything until the next header is its detail.
fn attach_violations(section: &[&str], contracts: &mut [Contract], diagnostics: &mut Vec<String>) {
    let mut current: Option<usize> = None;
    let mut i = 0;
    while i < section.len() {
        let line = section[i].trim();
        let underlined = section.get(i + 1).is_some_and(|next| is_rule(next));

        if !line.is_empty() && !is_rule(line) && underlined {
            current = contracts.iter().position(|c| c.name == line);
            if current.is_none() {
                warn!("broken contract '{}' missing from the contract list", line);
                diagnostics.push(format!("unlisted broken contract '{line}'"));
            }
            i += 2;
            continue;
        }

        if !line.is_empty() && !is_rule(line) {
            if let Some(index) = current {
                let detail = line.strip_prefix("- ").unwrap_or(line);
                contracts[index].violations.push(detail.to_string());
            }
        }
        i += 1;
    }
}

impl DataBuilder for ArchitectureBuilder {
    fn category(&self) -> Category {
        Category::Architecture
    }

    fn build(&self, raw: &RawSignal, _ctx: &mut BuildContext<'_>) -> MetricRecord {
        MetricRecord::Architecture(self.parse(raw))
    }

    fn not_configured(&self, reason: &str) -> MetricRecord {
        MetricRecord::Architecture(ArchitectureMetrics::not_configured("", reason))
    }
}
