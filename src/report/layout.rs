use crate::core::Category;
use crate::errors::Result;
use crate::io::{remove_file_if_exists, remove_matching};
use std::path::{Path, PathBuf};

/// Output tree of a report run.
///
/// ```text
/// <root>/summary.md
/// <root>/details/<category>.md
/// <root>/assets/images/<category>_<chart>.svg
/// <root>/assets/data/<category>.json
/// <root>/assets/data/summary.json
/// <root>/assets/data/dependencies.dot
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    summary_name: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, summary_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            summary_name: summary_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join(&self.summary_name)
    }

    pub fn details_dir(&self) -> PathBuf {
        self.root.join("details")
    }

    pub fn detail(&self, category: Category) -> PathBuf {
        self.details_dir().join(format!("{}.md", category.as_str()))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("assets").join("images")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("assets").join("data")
    }

    pub fn data(&self, category: Category) -> PathBuf {
        self.data_dir().join(format!("{}.json", category.as_str()))
    }

    pub fn summary_data(&self) -> PathBuf {
        self.data_dir().join("summary.json")
    }

    pub fn dependency_dot(&self) -> PathBuf {
        self.data_dir().join("dependencies.dot")
    }

    /// Delete whatever an earlier run wrote for `category`.
    pub fn clear(&self, category: Category) -> Result<()> {
        remove_file_if_exists(&self.detail(category))?;
        remove_file_if_exists(&self.data(category))?;
        if category == Category::Dependencies {
            remove_file_if_exists(&self.dependency_dot())?;
        }
        remove_matching(&self.images_dir(), &format!("{}_", category.as_str()), ".svg")?;
        Ok(())
    }
}

/// Link from the document at `from` to `target`, with forward slashes.
pub fn relative_link(from: &Path, target: &Path) -> String {
    let base = from.parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf());
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let layout = OutputLayout::new("/out", "summary.md");
        assert_eq!(layout.summary(), PathBuf::from("/out/summary.md"));
        assert_eq!(
            layout.detail(Category::E2eTests),
            PathBuf::from("/out/details/e2e_tests.md")
        );
        assert_eq!(
            layout.data(Category::Packages),
            PathBuf::from("/out/assets/data/packages.json")
        );
    }

    #[test]
    fn test_links_from_details_to_assets() {
        let layout = OutputLayout::new("/out", "summary.md");
        let detail = layout.detail(Category::Complexity);
        let image = layout.images_dir().join("complexity_top_offenders.svg");
        assert_eq!(
            relative_link(&detail, &image),
            "../assets/images/complexity_top_offenders.svg"
        );
        assert_eq!(
            relative_link(&layout.summary(), &detail),
            "details/complexity.md"
        );
    }

    #[test]
    fn test_clear_removes_only_that_category() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path(), "summary.md");
        for path in [
            layout.detail(Category::Dependencies),
            layout.data(Category::Dependencies),
            layout.dependency_dot(),
            layout.images_dir().join("dependencies_fan_in.svg"),
            layout.detail(Category::Packages),
            layout.images_dir().join("packages_health.svg"),
        ] {
            crate::io::write_file(&path, "old").unwrap();
        }

        layout.clear(Category::Dependencies).unwrap();

        assert!(!layout.detail(Category::Dependencies).exists());
        assert!(!layout.data(Category::Dependencies).exists());
        assert!(!layout.dependency_dot().exists());
        assert!(!layout.images_dir().join("dependencies_fan_in.svg").exists());
        assert!(layout.detail(Category::Packages).is_file());
        assert!(layout.images_dir().join("packages_health.svg").is_file());
        assert_eq!(fs::read_dir(layout.images_dir()).unwrap().count(), 1);
    }
}
