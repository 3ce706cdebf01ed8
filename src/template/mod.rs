//! Document templates with `{key}` placeholders.
//!
//! Substitution is a single left-to-right pass, so a substituted value is
//! never scanned again. `{{` and `}}` produce literal braces; any brace that
//! does not open a well-formed placeholder is copied as is. A placeholder
//! without a data entry is an error that names both key and template.

use crate::errors::{Error, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("summary.md", include_str!("../../templates/summary.md")),
    ("type_safety.md", include_str!("../../templates/type_safety.md")),
    ("complexity.md", include_str!("../../templates/complexity.md")),
    ("architecture.md", include_str!("../../templates/architecture.md")),
    ("dependencies.md", include_str!("../../templates/dependencies.md")),
    ("packages.md", include_str!("../../templates/packages.md")),
    ("unit_tests.md", include_str!("../../templates/unit_tests.md")),
    ("e2e_tests.md", include_str!("../../templates/e2e_tests.md")),
];

/// Values available to placeholders. Extra keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    values: BTreeMap<String, String>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for TemplateData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = TemplateData::new();
        for (key, value) in iter {
            data.set(key, value);
        }
        data
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Length in bytes of the placeholder key starting at `rest`, when `rest`
/// continues with `key}`.
fn placeholder_key(rest: &str) -> Option<&str> {
    let end = rest.find(|c: char| !is_key_char(c))?;
    (end > 0 && rest[end..].starts_with('}')).then(|| &rest[..end])
}

/// Render template text directly. `name` only labels errors.
pub fn render_str(name: &str, template: &str, data: &TemplateData) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            match placeholder_key(&tail[1..]) {
                Some(key) => {
                    let value = data.get(key).ok_or_else(|| Error::missing_key(key, name))?;
                    out.push_str(value);
                    rest = &tail[key.len() + 2..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Loads templates from an optional override directory, falling back to the
/// built-in set file by file.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    override_dir: Option<PathBuf>,
}

impl TemplateEngine {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn load(&self, name: &str) -> Result<Cow<'static, str>> {
        if let Some(dir) = &self.override_dir {
            let candidate = dir.join(name);
            if candidate.is_file() {
                debug!("using template override {}", candidate.display());
                return crate::io::read_file(&candidate).map(Cow::Owned);
            }
        }
        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| Cow::Borrowed(*text))
            .ok_or_else(|| Error::TemplateNotFound {
                name: name.to_string(),
            })
    }

    pub fn render(&self, name: &str, data: &TemplateData) -> Result<String> {
        let template = self.load(name)?;
        render_str(name, &template, data)
    }
}

/// Write `data` as indented UTF-8 JSON, creating parent directories.
pub fn save_data<T: Serialize + ?Sized>(data: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    crate::io::write_file(path, &(json + "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn data(pairs: &[(&str, &str)]) -> TemplateData {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_substitutes_placeholders() {
        let out = render_str("t", "Errors: {total_errors} in {files}", &data(&[("total_errors", "3"), ("files", "2")]))
            .unwrap();
        assert_eq!(out, "Errors: 3 in 2");
    }

    #[test]
    fn test_values_with_braces_are_literal() {
        let out = render_str("t", "{a}", &data(&[("a", "{b} and }} {{"), ("b", "nope")])).unwrap();
        assert_eq!(out, "{b} and }} {{");
    }

    #[test]
    fn test_escapes_and_stray_braces() {
        let out = render_str("t", "{{x}} { not a key } {} }", &data(&[("x", "1")])).unwrap();
        assert_eq!(out, "{x} { not a key } {} }");
    }

    #[test]
    fn test_missing_key_names_key_and_template() {
        let err = render_str("summary.md", "{present} {absent}", &data(&[("present", "1")])).unwrap_err();
        match err {
            Error::MissingTemplateKey { key, template } => {
                assert_eq!(key, "absent");
                assert_eq!(template, "summary.md");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multiline_and_unicode_values() {
        let value = "línea uno\nline two ✅\n模块";
        let out = render_str("t", "before\n{v}\nafter", &data(&[("v", value)])).unwrap();
        assert_eq!(out, format!("before\n{value}\nafter"));
    }

    #[test]
    fn test_unknown_template_is_error() {
        let err = TemplateEngine::builtin().render("nope.md", &TemplateData::new()).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound { .. }));
    }

    #[test]
    fn test_override_directory_wins_per_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("complexity.md"), "custom {title}").unwrap();
        let engine = TemplateEngine::new(Some(dir.path().to_path_buf()));

        assert_eq!(engine.load("complexity.md").unwrap(), "custom {title}");
        assert!(engine.load("packages.md").unwrap().contains("{health_score}"));
    }

    #[test]
    fn test_save_data_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/data.json");
        let value = serde_json::json!({
            "status": "PASS",
            "modules": [{"module": "shop", "errors": 0}],
            "note": "ünïcode {braces}",
        });
        save_data(&value, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"modules\""));
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    proptest! {
        #[test]
        fn prop_render_is_idempotent(values in proptest::collection::vec("[^\\x00]{0,20}", 1..5)) {
            let template: String = (0..values.len()).map(|i| format!("k{i}={{k{i}}};")).collect();
            let data: TemplateData = values.iter().enumerate().map(|(i, v)| (format!("k{i}"), v.clone())).collect();
            let first = render_str("t", &template, &data).unwrap();
            let second = render_str("t", &template, &data).unwrap();
            prop_assert_eq!(&first, &second);
            for value in &values {
                prop_assert!(first.contains(value.as_str()));
            }
        }

        #[test]
        fn prop_missing_key_always_errors(extra in 0usize..20) {
            let mut data = TemplateData::new();
            for i in 0..extra {
                data.set(format!("key{i}"), i);
            }
            let result = render_str("t", "{key0} {missing}", &data);
            prop_assert!(matches!(result, Err(Error::MissingTemplateKey { .. })), "expected MissingTemplateKey error, got {:?}", result);
        }
    }
}
