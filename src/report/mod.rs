//! Report orchestration.
//!
//! Each requested category runs build, grade, persist, chart and render on a
//! bounded worker pool. A category only writes below its own paths, so the
//! pipelines are independent. The summary is the join point: it waits for
//! every pipeline, aggregates the grades and renders the overview.

pub mod cancel;
pub mod documents;
pub mod layout;
pub mod signals;

use crate::builders::builder_for;
use crate::config::QualitymapConfig;
use crate::core::{BuildContext, Category, MetricRecord};
use crate::errors::{Error, Result, ResultExt};
use crate::grading::{aggregate, grade, GradeResult, OverallStatus};
use crate::graph::dot::{render_dot, DotConfig};
use crate::graph::GraphBuilder;
use crate::template::{save_data, TemplateData, TemplateEngine};
use crate::visualization::{ChartArtifact, NoCharts, SvgChartProvider, VisualizationProvider};
use documents::{detail_data, DocumentContext};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};

pub use cancel::CancellationToken;
pub use layout::{relative_link, OutputLayout};
pub use signals::{DirectorySignalSource, InMemorySignals, SignalSource};

/// What to report on and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub project_name: String,
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    pub categories: Vec<Category>,
}

impl ReportRequest {
    /// Request covering every category.
    pub fn new(
        project_name: impl Into<String>,
        source_root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            source_root: source_root.into(),
            output_dir: output_dir.into(),
            categories: Category::ALL.to_vec(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    /// Requested categories in display order, without duplicates.
    fn requested(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.categories.contains(c))
            .collect()
    }
}

/// Rendered text and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub path: PathBuf,
    pub text: String,
}

/// Everything one successful category pipeline produced.
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    pub record: MetricRecord,
    pub grade: GradeResult,
    pub charts: Vec<ChartArtifact>,
    pub data_file: PathBuf,
    pub document: ReportDocument,
}

impl CategoryOutcome {
    pub fn category(&self) -> Category {
        self.record.category()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    pub category: Category,
    pub message: String,
}

/// Per-category line of the machine-readable summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub grade: GradeResult,
    pub detail: String,
    pub data: String,
}

/// `assets/data/summary.json`, read by CI gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub project: String,
    pub generated_at: String,
    pub overall_status: OverallStatus,
    pub categories: Vec<CategorySummary>,
    pub not_requested: Vec<Category>,
    pub errors: Vec<PipelineError>,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub overall: OverallStatus,
    pub outcomes: Vec<CategoryOutcome>,
    pub not_requested: Vec<Category>,
    pub errors: Vec<PipelineError>,
    pub document: ReportDocument,
    pub data: SummaryData,
}

impl RunSummary {
    pub fn outcome(&self, category: Category) -> Option<&CategoryOutcome> {
        self.outcomes.iter().find(|o| o.category() == category)
    }

    pub fn grades(&self) -> impl Iterator<Item = &GradeResult> {
        self.outcomes.iter().map(|o| &o.grade)
    }
}

/// Number of pipeline workers: `jobs`, or one per CPU when 0, never more
/// than the number of categories.
pub fn worker_count(jobs: usize, categories: usize) -> usize {
    let available = if jobs == 0 { num_cpus::get() } else { jobs };
    available.min(categories).max(1)
}

pub struct ReportOrchestrator {
    config: QualitymapConfig,
    signals: Box<dyn SignalSource>,
    charts: Box<dyn VisualizationProvider>,
    templates: TemplateEngine,
    cancel: CancellationToken,
}

impl ReportOrchestrator {
    /// Orchestrator using the configured template directory and chart setting.
    pub fn new(config: QualitymapConfig, signals: Box<dyn SignalSource>) -> Self {
        let charts: Box<dyn VisualizationProvider> = if config.output.charts {
            Box::new(SvgChartProvider::new())
        } else {
            Box::new(NoCharts)
        };
        let templates = TemplateEngine::new(config.output.templates.clone());
        Self {
            config,
            signals,
            charts,
            templates,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_visualization(mut self, provider: Box<dyn VisualizationProvider>) -> Self {
        self.charts = provider;
        self
    }

    pub fn with_templates(mut self, templates: TemplateEngine) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn run(&self, request: &ReportRequest) -> Result<RunSummary> {
        let categories = self.requested_or_error(request)?;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let layout = OutputLayout::new(&request.output_dir, &self.config.output.summary_name);
        crate::io::ensure_dir(layout.root())?;

        let not_requested: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| !categories.contains(c))
            .collect();
        for &category in &not_requested {
            layout.clear(category)?;
        }
        let generated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();

        let workers = worker_count(self.config.output.jobs, categories.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot start worker pool: {e}")))?;
        info!(
            "generating {} categories with {} workers into {}",
            categories.len(),
            workers,
            layout.root().display()
        );

        let results: Vec<(Category, Result<CategoryOutcome>)> = pool.install(|| {
            categories
                .par_iter()
                .map(|&category| {
                    let result = self.run_category(category, request, &layout, &generated_at);
                    (category, result)
                })
                .collect()
        });

        if self.cancel.is_cancelled()
            || results
                .iter()
                .any(|(_, result)| matches!(result, Err(Error::Cancelled)))
        {
            warn!("report run cancelled, summary not written");
            return Err(Error::Cancelled);
        }

        let mut outcomes = Vec::new();
        let mut errors = Vec::new();
        for (category, result) in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    if e.is_template_error() {
                        warn!("{} document does not match its template: {}", category, e);
                    } else {
                        warn!("{} pipeline failed: {}", category, e);
                    }
                    if let Err(clear) = layout.clear(category) {
                        warn!("could not remove partial {} output: {}", category, clear);
                    }
                    errors.push(PipelineError {
                        category,
                        message: e.to_string(),
                    });
                }
            }
        }

        let overall =
            aggregate(outcomes.iter().map(|o| &o.grade)).with_pipeline_errors(errors.len());
        let data = SummaryData {
            project: request.project_name.clone(),
            generated_at: generated_at.clone(),
            overall_status: overall,
            categories: outcomes
                .iter()
                .map(|o| CategorySummary {
                    grade: o.grade.clone(),
                    detail: relative_link(&layout.summary(), &o.document.path),
                    data: relative_link(&layout.summary(), &o.data_file),
                })
                .collect(),
            not_requested: not_requested.clone(),
            errors: errors.clone(),
        };

        let text = self.render_summary(&data, &outcomes, &layout)?;
        let summary_path = layout.summary();
        crate::io::write_file(&summary_path, &text)?;
        save_data(&data, &layout.summary_data())?;
        info!("overall status: {}", overall);

        Ok(RunSummary {
            overall,
            outcomes,
            not_requested,
            errors,
            document: ReportDocument {
                path: summary_path,
                text,
            },
            data,
        })
    }

    fn requested_or_error(&self, request: &ReportRequest) -> Result<Vec<Category>> {
        let categories = request.requested();
        if categories.is_empty() {
            return Err(Error::Configuration(
                "no report categories requested".to_string(),
            ));
        }
        Ok(categories)
    }

    fn build_record(&self, category: Category, request: &ReportRequest) -> Result<MetricRecord> {
        let Some(builder) = builder_for(category, &self.config) else {
            let graph = GraphBuilder::new(
                &request.source_root,
                &self.config.source,
                self.config.graph.clone(),
            );
            return Ok(MetricRecord::Dependencies(graph.analyze()));
        };

        match self.signals.collect(category)? {
            Some(raw) => {
                let resolver = self.config.source.resolver();
                let mut ctx = BuildContext::new(resolver.as_ref());
                let record = builder.build(&raw, &mut ctx);
                debug!(
                    "{}: resolved {} paths ({} cache hits)",
                    category,
                    ctx.cache().len(),
                    ctx.cache().hits()
                );
                Ok(record)
            }
            None => Ok(builder.not_configured(&format!("no {} output was provided", category.title()))),
        }
    }

    fn run_category(
        &self,
        category: Category,
        request: &ReportRequest,
        layout: &OutputLayout,
        generated_at: &str,
    ) -> Result<CategoryOutcome> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let span = info_span!("category", name = %category);
        let _enter = span.enter();
        layout
            .clear(category)
            .context(format!("removing previous {category} output"))?;

        let record = self.build_record(category, request)?;
        let grade = grade(&record);
        debug!("graded {} as {}", category, grade.status);

        let data_file = layout.data(category);
        save_data(&record, &data_file).context(format!("saving {category} data"))?;

        let dot_file = match &record {
            MetricRecord::Dependencies(metrics) => {
                let path = layout.dependency_dot();
                crate::io::write_file(&path, &render_dot(metrics, &DotConfig::default()))?;
                Some(path)
            }
            _ => None,
        };

        let charts = self
            .charts
            .generate(&record, &layout.images_dir())
            .context(format!("drawing {category} charts"))?;

        let document_path = layout.detail(category);
        let ctx = DocumentContext {
            project: &request.project_name,
            generated_at,
            document: &document_path,
            data_file: &data_file,
            dot_file,
            charts: &charts,
        };
        let data = detail_data(&record, &grade, &ctx);
        let template = format!("{}.md", category.as_str());
        let text = self.templates.render(&template, &data)?;
        crate::io::write_file(&document_path, &text)?;

        Ok(CategoryOutcome {
            record,
            grade,
            charts,
            data_file,
            document: ReportDocument {
                path: document_path,
                text,
            },
        })
    }

    fn render_summary(
        &self,
        data: &SummaryData,
        outcomes: &[CategoryOutcome],
        layout: &OutputLayout,
    ) -> Result<String> {
        let summary_path = layout.summary();
        let rows: Vec<String> = Category::ALL
            .into_iter()
            .map(|category| {
                if let Some(outcome) = outcomes.iter().find(|o| o.category() == category) {
                    let g = &outcome.grade;
                    format!(
                        "| {} {} | {} | {} | {} | [details]({}) |",
                        g.emoji,
                        category.title(),
                        g.status.label(),
                        g.grade,
                        g.score.map(|s| format!("{s:.1}")).unwrap_or_else(|| "-".to_string()),
                        relative_link(&summary_path, &outcome.document.path)
                    )
                } else if data.errors.iter().any(|e| e.category == category) {
                    format!("| ❗ {} | Error | - | - | - |", category.title())
                } else {
                    format!("| {} | N/A | N/A | - | - |", category.title())
                }
            })
            .collect();

        let pipeline_errors = if data.errors.is_empty() {
            String::new()
        } else {
            let lines: Vec<String> = data
                .errors
                .iter()
                .map(|e| format!("- **{}**: {}", e.category.title(), e.message))
                .collect();
            format!("## Pipeline errors\n\n{}\n", lines.join("\n"))
        };

        let values = TemplateData::new()
            .with("project", &data.project)
            .with("generated_at", &data.generated_at)
            .with("overall_status", data.overall_status.label())
            .with("overall_emoji", data.overall_status.emoji())
            .with("category_rows", rows.join("\n"))
            .with("pipeline_errors", pipeline_errors);
        self.templates.render("summary.md", &values)
    }
}
