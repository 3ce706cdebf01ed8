use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::QualitymapConfig;
use super::thresholds::{ComplexityThresholds, GraphThresholds, PackagePenalties};
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = ".qualitymap.toml";

/// Pure function to read config file contents
pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse a TOML config, replacing invalid sections with their defaults
pub fn parse_and_validate_config(contents: &str) -> Result<QualitymapConfig, String> {
    let mut config = toml::from_str::<QualitymapConfig>(contents)
        .map_err(|e| format!("Failed to parse {CONFIG_FILE_NAME}: {e}"))?;

    if let Err(e) = config.complexity.validate() {
        warn!("Invalid complexity settings: {}. Using defaults.", e);
        config.complexity = ComplexityThresholds::default();
    }
    if let Err(e) = config.packages.validate() {
        warn!("Invalid package penalties: {}. Using defaults.", e);
        config.packages = PackagePenalties::default();
    }
    if let Err(e) = config.graph.validate() {
        warn!("Invalid graph settings: {}. Using defaults.", e);
        config.graph = GraphThresholds::default();
    }
    if config.source.module_depth == 0 {
        warn!("source.module_depth must be positive. Using 1.");
        config.source.module_depth = 1;
    }

    Ok(config)
}

/// Load a config from an explicit path; errors are surfaced
pub fn load_config_from_path(path: &Path) -> crate::errors::Result<QualitymapConfig> {
    let contents = read_config_file(path).map_err(|e| crate::errors::Error::io_at(path, e))?;
    parse_and_validate_config(&contents).map_err(crate::errors::Error::Configuration)
}

pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<QualitymapConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            warn!("{}. Using defaults.", e);
            None
        }
    }
}

/// Only log actual errors, not "file not found"
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    if error.kind() != std::io::ErrorKind::NotFound {
        warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Pure function to generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Per-user config file, e.g. `~/.config/qualitymap/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qualitymap").join("config.toml"))
}

/// Search `start` and its ancestors, then the user config, else defaults
pub fn load_config(start: &Path) -> QualitymapConfig {
    const MAX_TRAVERSAL_DEPTH: usize = 10;

    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .chain(user_config_path())
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            QualitymapConfig::default()
        })
}

/// Default config rendered as TOML, used by `qualitymap init`
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&QualitymapConfig::default()).unwrap_or_default()
}
