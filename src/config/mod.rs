mod core;
mod loader;
mod thresholds;

pub use self::core::{
    OutputConfig, ProjectConfig, QualitymapConfig, ResolverKind, SignalsConfig, SourceConfig,
    DEFAULT_EXCLUDED_DIRS,
};

pub use self::loader::{
    default_config_toml, directory_ancestors, load_config, load_config_from_path,
    parse_and_validate_config, user_config_path, CONFIG_FILE_NAME,
};

pub use self::thresholds::{
    ComplexityThresholds, GraphThresholds, PackagePenalties, TestReportSettings,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Category;
    use indoc::indoc;

    #[test]
    fn test_default_exclusions_keep_test_directories() {
        let dirs = SourceConfig::default().excluded_dirs();
        for name in ["test", "tests", "testing", "e2e", "unit"] {
            assert!(
                !dirs.iter().any(|d| d == name),
                "default exclusions must not contain '{name}'"
            );
        }
        assert!(dirs.iter().any(|d| d == ".venv"));
    }

    #[test]
    fn test_explicit_exclusion_replaces_defaults() {
        let source = SourceConfig {
            exclude: Some(vec!["generated".to_string()]),
            extra_exclude: vec!["tests".to_string()],
            ..Default::default()
        };
        assert_eq!(
            source.excluded_dirs(),
            vec!["generated".to_string(), "tests".to_string()]
        );
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = indoc! {r#"
            [project]
            name = "Shop"

            [source]
            root_prefix = "backend/src"
            module_depth = 2
            resolver = "dotted"
            extra_exclude = ["migrations"]

            [graph]
            max_isolated = 0
            entry_points = ["shop.cli"]

            [complexity]
            max_complexity = 12
            fail_over = 30

            [packages]
            vulnerability_penalty = 25.0

            [signals]
            type_safety = "mypy.log"
        "#};

        let config = parse_and_validate_config(toml_content).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("Shop"));
        assert_eq!(config.source.resolver, ResolverKind::Dotted);
        assert_eq!(config.graph.max_isolated, 0);
        assert_eq!(config.complexity.fail_over, Some(30));
        assert_eq!(config.packages.vulnerability_penalty, 25.0);
        assert_eq!(config.packages.outdated_penalty, 2.0);
        assert_eq!(
            config.signals.file_name(Category::TypeSafety),
            Some("mypy.log")
        );
        assert_eq!(
            config.signals.file_name(Category::UnitTests),
            Some("unit_tests.json")
        );
        assert!(config.source.excluded_dirs().contains(&"migrations".to_string()));
    }

    #[test]
    fn test_invalid_sections_replaced_with_defaults() {
        let toml_content = indoc! {r#"
            [complexity]
            max_complexity = 0

            [packages]
            outdated_penalty = -4.0
        "#};
        let config = parse_and_validate_config(toml_content).unwrap();
        assert_eq!(config.complexity, ComplexityThresholds::default());
        assert_eq!(config.packages, PackagePenalties::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = parse_and_validate_config("invalid toml [[ content");
        assert!(result.unwrap_err().contains("Failed to parse"));
    }

    #[test]
    fn test_load_config_from_ancestor() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[graph]\nmax_isolated = 42\n",
        )
        .unwrap();

        let config = load_config(&nested);
        assert_eq!(config.graph.max_isolated, 42);
    }

    #[test]
    fn test_default_config_toml_parses_back() {
        let rendered = default_config_toml();
        let parsed = parse_and_validate_config(&rendered).unwrap();
        assert_eq!(parsed, QualitymapConfig::default());
    }

    #[test]
    fn test_directory_ancestors_bounded() {
        let ancestors: Vec<_> =
            directory_ancestors(std::path::PathBuf::from("/a/b/c/d"), 2).collect();
        assert_eq!(ancestors.len(), 2);
    }
}
