//! Package inventory, outdated delta and vulnerability audit.
//!
//! Input is one JSON document; every key is optional:
//!
//! ```json
//! {
//!   "installed": [{"name": "requests", "version": "2.31.0"}],
//!   "outdated": [{"name": "rich", "version": "12.0.0", "latest_version": "13.7.0"}],
//!   "vulnerabilities": {"dependencies": [{"name": "jinja2", "version": "3.1.2",
//!                        "vulns": [{"id": "GHSA-h5c8-rqwp-cp95", "fix_versions": ["3.1.3"]}]}]}
//! }
//! ```
//!
//! `vulnerabilities` also accepts a flat list of `{name, version, id, ...}`.
//! A bare list is read as `installed`. Entries that do not match their shape
//! are skipped one by one and listed in `diagnostics`.

use super::{round1, DataBuilder};
use crate::config::PackagePenalties;
use crate::core::{BuildContext, Category, MetricRecord, RawSignal, Status};
use crate::grading::{decide, GradeInput};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub current: String,
    pub latest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub package: String,
    pub version: String,
    pub id: String,
    pub fix_versions: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetrics {
    pub status: Status,
    pub configured: bool,
    pub source: String,
    pub total_installed: usize,
    pub outdated: Vec<OutdatedPackage>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub vulnerable_packages: usize,
    /// 100 minus penalties, floored at 0
    pub health_score: f64,
    pub diagnostics: Vec<String>,
}

impl PackageMetrics {
    pub fn grade_input(&self) -> GradeInput {
        if !self.configured {
            return GradeInput::not_configured();
        }
        if self.total_installed == 0 && self.outdated.is_empty() && self.vulnerabilities.is_empty()
        {
            return GradeInput::no_data();
        }
        GradeInput::counts(self.vulnerabilities.len(), self.outdated.len())
            .with_score(self.health_score)
    }

    fn not_configured(source: &str, reason: &str) -> Self {
        let mut metrics = Self {
            status: Status::NotConfigured,
            configured: false,
            source: source.to_string(),
            total_installed: 0,
            outdated: Vec::new(),
            vulnerabilities: Vec::new(),
            vulnerable_packages: 0,
            health_score: 0.0,
            diagnostics: vec![reason.to_string()],
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

#[derive(Debug, Deserialize)]
struct InstalledEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OutdatedEntry {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default, alias = "latest")]
    latest_version: String,
}

#[derive(Debug, Deserialize)]
struct AuditDependency {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    vulns: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AuditVulnerability {
    id: String,
    #[serde(default)]
    fix_versions: Vec<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct FlatVulnerability {
    #[serde(alias = "package")]
    name: String,
    #[serde(default)]
    version: String,
    id: String,
    #[serde(default)]
    fix_versions: Vec<String>,
    #[serde(default)]
    description: String,
}

impl From<FlatVulnerability> for Vulnerability {
    fn from(v: FlatVulnerability) -> Self {
        Self {
            package: v.name,
            version: v.version,
            id: v.id,
            fix_versions: v.fix_versions,
            description: v.description,
        }
    }
}

/// Collects what was skipped while reading one document.
struct SectionReader<'a> {
    origin: &'a str,
    diagnostics: Vec<String>,
}

impl<'a> SectionReader<'a> {
    fn new(origin: &'a str) -> Self {
        Self {
            origin,
            diagnostics: Vec::new(),
        }
    }

    fn skip(&mut self, message: String) {
        warn!("{}: {}", self.origin, message);
        self.diagnostics.push(message);
    }

    /// Deserialize each list element on its own; a bad element costs only itself.
    fn entries<T: DeserializeOwned>(&mut self, section: &str, value: Option<Value>) -> Vec<T> {
        let items = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.skip(format!("ignored {section}: expected a list"));
                return Vec::new();
            }
        };
        let mut parsed = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value(item) {
                Ok(entry) => parsed.push(entry),
                Err(e) => self.skip(format!("skipped malformed {section} entry {}: {e}", index + 1)),
            }
        }
        parsed
    }

    /// Flat list, or the `{"dependencies": [...]}` audit report.
    fn vulnerabilities(&mut self, value: Option<Value>) -> Vec<Vulnerability> {
        let mut report = match value {
            Some(Value::Object(report)) => report,
            other => {
                return self
                    .entries::<FlatVulnerability>("vulnerabilities", other)
                    .into_iter()
                    .map(Vulnerability::from)
                    .collect();
            }
        };

        let dependencies: Vec<AuditDependency> =
            self.entries("vulnerabilities.dependencies", report.remove("dependencies"));
        let mut found = Vec::new();
        for dep in dependencies {
            let section = format!("{} vulns", dep.name);
            let vulns: Vec<AuditVulnerability> = self.entries(&section, Some(Value::Array(dep.vulns)));
            found.extend(vulns.into_iter().map(|v| Vulnerability {
                package: dep.name.clone(),
                version: dep.version.clone(),
                id: v.id,
                fix_versions: v.fix_versions,
                description: v.description,
            }));
        }
        found
    }
}

#[derive(Debug, Clone)]
pub struct PackageBuilder {
    penalties: PackagePenalties,
}

impl PackageBuilder {
    pub fn new(penalties: PackagePenalties) -> Self {
        Self { penalties }
    }

    /// 100 minus a fixed penalty per outdated and per vulnerable package.
    pub fn health_score(&self, outdated: usize, vulnerable_packages: usize) -> f64 {
        let penalty = outdated as f64 * self.penalties.outdated_penalty
            + vulnerable_packages as f64 * self.penalties.vulnerability_penalty;
        round1((100.0 - penalty).max(0.0))
    }

    pub fn parse(&self, raw: &RawSignal) -> PackageMetrics {
        if raw.is_blank() {
            return PackageMetrics::not_configured(&raw.origin, "package inventory is empty");
        }

        let document = match serde_json::from_str::<Value>(&raw.content) {
            Ok(document) => document,
            Err(e) => {
                warn!("{}: invalid package inventory: {}", raw.origin, e);
                return PackageMetrics::not_configured(
                    &raw.origin,
                    &format!("invalid package inventory JSON: {e}"),
                );
            }
        };

        let mut reader = SectionReader::new(&raw.origin);
        let (installed, outdated, vulnerabilities) = match document {
            Value::Array(items) => (
                reader.entries::<InstalledEntry>("installed", Some(Value::Array(items))),
                Vec::new(),
                Vec::new(),
            ),
            Value::Object(mut sections) => (
                reader.entries::<InstalledEntry>("installed", sections.remove("installed")),
                reader.entries::<OutdatedEntry>("outdated", sections.remove("outdated")),
                reader.vulnerabilities(sections.remove("vulnerabilities")),
            ),
            _ => {
                return PackageMetrics::not_configured(
                    &raw.origin,
                    "invalid package inventory: expected an object or a list",
                );
            }
        };

        let installed: BTreeSet<String> = installed.iter().map(|p| p.name.to_lowercase()).collect();

        let mut outdated: Vec<OutdatedPackage> = outdated
            .into_iter()
            .map(|p| OutdatedPackage {
                name: p.name,
                current: p.version,
                latest: p.latest_version,
            })
            .collect();
        outdated.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let mut vulnerabilities = vulnerabilities;
        vulnerabilities.sort_by(|a, b| {
            a.package
                .to_lowercase()
                .cmp(&b.package.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        let vulnerable_packages = vulnerabilities
            .iter()
            .map(|v| v.package.to_lowercase())
            .collect::<BTreeSet<_>>()
            .len();

        let mut metrics = PackageMetrics {
            status: Status::NoData,
            configured: true,
            source: raw.origin.clone(),
            total_installed: installed.len(),
            health_score: self.health_score(outdated.len(), vulnerable_packages),
            outdated,
            vulnerabilities,
            vulnerable_packages,
            diagnostics: reader.diagnostics,
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

impl DataBuilder for PackageBuilder {
    fn category(&self) -> Category {
        Category::Packages
    }

    fn build(&self, raw: &RawSignal, _ctx: &mut BuildContext<'_>) -> MetricRecord {
        MetricRecord::Packages(self.parse(raw))
    }

    fn not_configured(&self, reason: &str) -> MetricRecord {
        MetricRecord::Packages(PackageMetrics::not_configured("", reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(json: &str) -> PackageMetrics {
        PackageBuilder::new(PackagePenalties::default())
            .parse(&RawSignal::new(Category::Packages, "packages.json", json))
    }

    #[test]
    fn test_vulnerability_outranks_outdated() {
        let metrics = parse(indoc! {r#"
            {
              "installed": [{"name": "jinja2", "version": "3.1.2"}, {"name": "rich", "version": "13.7.0"}],
              "outdated": [],
              "vulnerabilities": [{"name": "jinja2", "version": "3.1.2", "id": "GHSA-h5c8-rqwp-cp95", "fix_versions": ["3.1.3"]}]
            }
        "#});
        assert_eq!(metrics.vulnerabilities.len(), 1);
        assert!(metrics.outdated.is_empty());
        assert_eq!(metrics.status, Status::Fail);
        assert_eq!(metrics.health_score, 90.0);
    }

    #[test]
    fn test_outdated_only_warns() {
        let metrics = parse(indoc! {r#"
            {
              "installed": [{"name": "rich", "version": "12.0.0"}, {"name": "attrs", "version": "21.0"}],
              "outdated": [
                {"name": "rich", "version": "12.0.0", "latest_version": "13.7.0", "latest_filetype": "wheel"},
                {"name": "attrs", "version": "21.0", "latest_version": "23.2.0"}
              ]
            }
        "#});
        assert_eq!(metrics.status, Status::Warn);
        assert_eq!(metrics.outdated[0].name, "attrs");
        assert_eq!(metrics.health_score, 96.0);
    }

    #[test]
    fn test_clean_inventory_passes() {
        let metrics = parse(r#"{"installed": [{"name": "requests", "version": "2.31.0"}]}"#);
        assert_eq!(metrics.status, Status::Pass);
        assert_eq!(metrics.health_score, 100.0);
        assert_eq!(metrics.total_installed, 1);
    }

    #[test]
    fn test_pip_audit_shape() {
        let metrics = parse(indoc! {r#"
            {
              "installed": [{"name": "django", "version": "3.2.0"}],
              "vulnerabilities": {"dependencies": [
                {"name": "django", "version": "3.2.0", "vulns": [
                  {"id": "PYSEC-2023-1", "fix_versions": ["3.2.18"], "description": "SQL injection"},
                  {"id": "PYSEC-2022-9", "fix_versions": []}
                ]},
                {"name": "idna", "version": "3.4", "vulns": []}
              ]}
            }
        "#});
        assert_eq!(metrics.vulnerabilities.len(), 2);
        assert_eq!(metrics.vulnerable_packages, 1);
        assert_eq!(metrics.vulnerabilities[0].id, "PYSEC-2022-9");
        assert_eq!(metrics.health_score, 90.0);
    }

    #[test]
    fn test_score_floored_at_zero() {
        let builder = PackageBuilder::new(PackagePenalties::default());
        assert_eq!(builder.health_score(100, 100), 0.0);
        assert_eq!(builder.health_score(0, 0), 100.0);
    }

    #[test]
    fn test_malformed_json_is_not_configured() {
        let metrics = parse("{not json");
        assert_eq!(metrics.status, Status::NotConfigured);
        assert!(metrics.diagnostics[0].contains("invalid package inventory"));
    }

    #[test]
    fn test_malformed_vulnerability_keeps_valid_ones() {
        let metrics = parse(indoc! {r#"
            {
              "installed": [{"name": "jinja2", "version": "3.1.2"}],
              "vulnerabilities": [
                {"name": "jinja2", "version": "3.1.2", "id": "GHSA-h5c8-rqwp-cp95"},
                {"name": "jinja2", "version": "3.1.2", "vulnerability_id": "CVE-2024-22195"}
              ]
            }
        "#});
        assert_eq!(metrics.status, Status::Fail);
        assert_eq!(metrics.vulnerabilities.len(), 1);
        assert_eq!(metrics.vulnerabilities[0].id, "GHSA-h5c8-rqwp-cp95");
        assert_eq!(metrics.diagnostics.len(), 1);
        assert!(metrics.diagnostics[0].contains("skipped malformed vulnerabilities entry 2"));
    }

    #[test]
    fn test_bad_section_does_not_drop_the_rest() {
        let metrics = parse(indoc! {r#"
            {
              "installed": [{"name": "django"}, {"version": "1.0"}],
              "outdated": {"django": "4.2"},
              "vulnerabilities": {"dependencies": [
                {"name": "django", "version": "3.2.0", "vulns": [{"id": "PYSEC-2023-1"}, {"aliases": []}]},
                "not a dependency"
              ]}
            }
        "#});
        assert_eq!(metrics.status, Status::Fail);
        assert_eq!(metrics.total_installed, 1);
        assert!(metrics.outdated.is_empty());
        assert_eq!(metrics.vulnerabilities.len(), 1);
        assert_eq!(metrics.diagnostics.len(), 4);
        assert!(metrics.diagnostics.iter().any(|d| d == "ignored outdated: expected a list"));
    }

    #[test]
    fn test_scalar_document_is_not_configured() {
        assert_eq!(parse("42").status, Status::NotConfigured);
    }

    #[test]
    fn test_bare_installed_list() {
        let metrics = parse(r#"[{"name": "a", "version": "1"}, {"name": "b", "version": "2"}]"#);
        assert_eq!(metrics.total_installed, 2);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_empty_document_is_no_data() {
        let metrics = parse("{}");
        assert_eq!(metrics.status, Status::NoData);
    }
}
