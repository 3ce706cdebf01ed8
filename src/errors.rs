//! Shared error types for report generation.
//!
//! Only the rendering and persistence layers return these. Data builders never
//! fail: malformed tool output is logged and folded into a partial record.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for qualitymap operations
#[derive(Debug, Error)]
pub enum Error {
    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A placeholder in a template had no matching data entry
    #[error("Missing key '{key}' while rendering template '{template}'")]
    MissingTemplateKey { key: String, template: String },

    /// No template with this name in the override directory or built-ins
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Signal collection errors
    #[error("Signal error: {0}")]
    Signal(String),

    /// Source file that could not be parsed
    #[error("Parse error in {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Run was cancelled between category pipelines
    #[error("Report run cancelled")]
    Cancelled,

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O failure on a specific path
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::FileSystem {
            message: format!("{} ({})", source, path.display()),
            path: Some(path),
            source: Some(source),
        }
    }

    pub fn missing_key(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self::MissingTemplateKey {
            key: key.into(),
            template: template.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }

    /// True for errors that guard the data/template contract.
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTemplateKey { .. } | Self::TemplateNotFound { .. }
        )
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
