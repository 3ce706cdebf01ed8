//! Where raw tool output comes from.

use crate::config::SignalsConfig;
use crate::core::{Category, RawSignal};
use crate::errors::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hands raw tool output to the orchestrator.
///
/// `Ok(None)` means the collector has nothing for the category; the
/// category is then reported as not configured. `Err` is reserved for
/// output that exists but cannot be read.
pub trait SignalSource: Send + Sync {
    fn collect(&self, category: Category) -> Result<Option<RawSignal>>;
}

/// Reads one file per category from a signals directory.
#[derive(Debug, Clone)]
pub struct DirectorySignalSource {
    dir: PathBuf,
    names: SignalsConfig,
}

impl DirectorySignalSource {
    pub fn new(dir: impl Into<PathBuf>, names: SignalsConfig) -> Self {
        Self {
            dir: dir.into(),
            names,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, category: Category) -> Option<PathBuf> {
        self.names.file_name(category).map(|name| self.dir.join(name))
    }
}

impl SignalSource for DirectorySignalSource {
    fn collect(&self, category: Category) -> Result<Option<RawSignal>> {
        let Some(path) = self.path_for(category) else {
            return Ok(None);
        };
        if !path.exists() {
            debug!("no {} signal at {}", category, path.display());
            return Ok(None);
        }
        if !path.is_file() {
            return Err(Error::Signal(format!(
                "{} signal path {} is not a file",
                category,
                path.display()
            )));
        }
        RawSignal::from_file(category, &path).map(Some)
    }
}

/// Signals held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySignals {
    signals: HashMap<Category, RawSignal>,
}

impl InMemorySignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, content: impl Into<String>) -> &mut Self {
        let signal = RawSignal::new(category, format!("memory:{category}"), content);
        self.signals.insert(category, signal);
        self
    }

    pub fn with(mut self, category: Category, content: impl Into<String>) -> Self {
        self.insert(category, content);
        self
    }
}

impl SignalSource for InMemorySignals {
    fn collect(&self, category: Category) -> Result<Option<RawSignal>> {
        Ok(self.signals.get(&category).cloned())
    }
}
