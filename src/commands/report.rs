//! The `report` command: config resolution, run, terminal summary.

use crate::config::{load_config, load_config_from_path, QualitymapConfig};
use crate::core::Category;
use crate::formatting::render_summary_table;
use crate::grading::OverallStatus;
use crate::report::{DirectorySignalSource, ReportOrchestrator, ReportRequest, RunSummary};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Options of one `report` invocation after argument parsing.
#[derive(Debug, Clone, Default)]
pub struct ReportCommand {
    pub source_root: PathBuf,
    pub signals: PathBuf,
    pub output: PathBuf,
    pub categories: Option<Vec<Category>>,
    pub project: Option<String>,
    pub config: Option<PathBuf>,
    pub templates: Option<PathBuf>,
    pub no_charts: bool,
    pub jobs: Option<usize>,
    pub color: bool,
}

impl ReportCommand {
    /// Configuration file settings with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<QualitymapConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from_path(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => load_config(&std::env::current_dir()?),
        };
        if let Some(templates) = &self.templates {
            config.output.templates = Some(templates.clone());
        }
        if self.no_charts {
            config.output.charts = false;
        }
        if let Some(jobs) = self.jobs {
            config.output.jobs = jobs;
        }
        Ok(config)
    }

    /// `--project`, then the config file, then the source directory name.
    pub fn project_name(&self, config: &QualitymapConfig) -> String {
        self.project
            .clone()
            .or_else(|| config.project.name.clone())
            .or_else(|| directory_name(&self.source_root))
            .unwrap_or_else(|| "project".to_string())
    }

    pub fn request(&self, config: &QualitymapConfig) -> ReportRequest {
        let request = ReportRequest::new(
            self.project_name(config),
            &self.source_root,
            &self.output,
        );
        match &self.categories {
            Some(categories) => request.with_categories(categories.clone()),
            None => request,
        }
    }
}

fn directory_name(path: &Path) -> Option<String> {
    let absolute = path.canonicalize().ok()?;
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Run the report and print the terminal summary.
pub fn run_report(command: &ReportCommand) -> Result<RunSummary> {
    let config = command.resolve_config()?;
    let request = command.request(&config);
    let signals = DirectorySignalSource::new(&command.signals, config.signals.clone());
    info!("reading signals from {}", signals.dir().display());

    let summary = ReportOrchestrator::new(config, Box::new(signals))
        .run(&request)
        .context("Report generation failed")?;

    print!("{}", render_summary_table(&summary, command.color));
    Ok(summary)
}

/// Process exit code for a finished run.
pub fn exit_code(overall: OverallStatus, fail_on_error: bool) -> i32 {
    if fail_on_error && overall.is_failure() {
        1
    } else {
        0
    }
}
