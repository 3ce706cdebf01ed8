//! qualitymap turns raw output of code-quality tools into one report.
//!
//! Every category (type safety, complexity, architecture contracts, the
//! import dependency graph, unit and end-to-end tests, installed packages)
//! runs as an independent pipeline: build a metrics record, grade it, save
//! its data, draw charts and render a Markdown document. A summary document
//! aggregates the grades.

pub mod builders;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod errors;
pub mod formatting;
pub mod grading;
pub mod graph;
pub mod io;
pub mod observability;
pub mod report;
pub mod template;
pub mod visualization;

pub use crate::config::QualitymapConfig;
pub use crate::core::{Category, MetricRecord, RawSignal, Status};
pub use crate::errors::{Error, Result};
pub use crate::grading::{aggregate, decide, grade, GradeInput, GradeResult, OverallStatus};
pub use crate::report::{
    CancellationToken, DirectorySignalSource, InMemorySignals, ReportOrchestrator, ReportRequest,
    RunSummary, SignalSource,
};
