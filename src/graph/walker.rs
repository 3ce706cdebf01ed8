use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

const SOURCE_EXTENSION: &str = "py";

/// Collects Python source files below a root, skipping excluded directories.
///
/// Exclusions match whole path components exactly, so excluding `build`
/// never hides `builders/`.
pub struct SourceWalker {
    root: PathBuf,
    excluded_dirs: Vec<String>,
}

impl SourceWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: Vec::new(),
        }
    }

    pub fn with_excluded_dirs(mut self, dirs: Vec<String>) -> Self {
        self.excluded_dirs = dirs;
        self
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excluded_dirs.iter().any(|d| d == name))
    }

    fn has_source_extension(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
    }

    /// Files in deterministic order. Unreadable directory entries are logged
    /// and skipped.
    pub fn walk(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {}", self.root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && Self::has_source_extension(entry.path()))
            .map(DirEntry::into_path)
            .collect()
    }
}

/// Dotted module name for a file relative to the scan root.
///
/// `pkg/__init__.py` is `pkg`, `pkg/mod.py` is `pkg.mod`. A root-level
/// `__init__.py` has no name and yields `None`.
pub fn module_name(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut parts: Vec<String> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect();
    let last = parts.pop()?;
    let stem = Path::new(&last).file_stem()?.to_str()?.to_string();
    if stem != "__init__" {
        parts.push(stem);
    }
    (!parts.is_empty()).then(|| parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_walk_skips_excluded_components_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "shop/orders.py");
        touch(dir.path(), "build/generated.py");
        touch(dir.path(), "builders/factory.py");
        touch(dir.path(), "tests/test_orders.py");
        touch(dir.path(), "shop/README.md");

        let files = SourceWalker::new(dir.path())
            .with_excluded_dirs(vec!["build".to_string()])
            .walk();
        let names: Vec<String> = files
            .iter()
            .filter_map(|f| module_name(dir.path(), f))
            .collect();

        assert_eq!(names, vec!["builders.factory", "shop.orders", "tests.test_orders"]);
    }

    #[test]
    fn test_module_name_drops_init() {
        let root = Path::new("/repo");
        assert_eq!(
            module_name(root, Path::new("/repo/shop/__init__.py")).as_deref(),
            Some("shop")
        );
        assert_eq!(
            module_name(root, Path::new("/repo/shop/api/v1.py")).as_deref(),
            Some("shop.api.v1")
        );
        assert_eq!(module_name(root, Path::new("/repo/__init__.py")), None);
    }
}
