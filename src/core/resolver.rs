//! Path to module resolution.
//!
//! Tool output names files, reports name modules. How a path maps to a module
//! depends on the project layout, so the mapping is a pluggable strategy and
//! never a fixed path-segment offset. Memoisation lives in a [`ResolutionCache`]
//! owned by the [`BuildContext`] of one pipeline; nothing is cached globally.

use std::collections::HashMap;
use std::fmt;

/// Module name used when a path cannot be mapped.
pub const UNKNOWN_MODULE: &str = "(unknown)";

/// Maps a file path as printed by a tool to a module identifier.
pub trait ModuleResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, path: &str) -> Option<String>;
}

/// Splits a tool-reported path into clean components.
///
/// Backslashes are treated as separators, `.` components are dropped and the
/// final component loses its extension. A trailing `__init__` is removed so a
/// package's init file resolves to the package itself.
fn module_components(path: &str) -> Vec<String> {
    let normalized = path.trim().replace('\\', "/");
    let mut parts: Vec<String> = normalized
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_string)
        .collect();

    if let Some(last) = parts.last_mut() {
        if let Some((stem, _ext)) = last.rsplit_once('.') {
            if !stem.is_empty() {
                *last = stem.to_string();
            }
        }
    }
    if parts.last().is_some_and(|last| last == "__init__") {
        parts.pop();
    }
    parts
}

/// Index just past the first occurrence of `prefix` inside `parts`.
fn after_prefix(parts: &[String], prefix: &[String]) -> Option<usize> {
    if prefix.is_empty() {
        return Some(0);
    }
    parts
        .windows(prefix.len())
        .position(|window| window == prefix)
        .map(|start| start + prefix.len())
}

fn prefix_components(prefix: &str) -> Vec<String> {
    prefix
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_string)
        .collect()
}

/// Takes the first `depth` segments after an explicit root prefix.
///
/// With `root_prefix = "src"` and `depth = 2`,
/// `src/shop/orders/api.py` resolves to `shop.orders`. Paths that do not
/// contain the prefix are resolved from their first segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentResolver {
    root_prefix: Vec<String>,
    depth: usize,
}

impl SegmentResolver {
    pub fn new(root_prefix: &str, depth: usize) -> Self {
        Self {
            root_prefix: prefix_components(root_prefix),
            depth: depth.max(1),
        }
    }
}

impl ModuleResolver for SegmentResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        let parts = module_components(path);
        let start = after_prefix(&parts, &self.root_prefix).unwrap_or(0);
        let tail = &parts[start..];
        if tail.is_empty() {
            return None;
        }
        let take = tail.len().min(self.depth);
        Some(tail[..take].join("."))
    }
}

/// The full path below an optional root prefix, as a dotted name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DottedPathResolver {
    root_prefix: Vec<String>,
}

impl DottedPathResolver {
    pub fn new(root_prefix: Option<&str>) -> Self {
        Self {
            root_prefix: root_prefix.map(prefix_components).unwrap_or_default(),
        }
    }
}

impl ModuleResolver for DottedPathResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        let parts = module_components(path);
        let start = after_prefix(&parts, &self.root_prefix).unwrap_or(0);
        let tail = &parts[start..];
        (!tail.is_empty()).then(|| tail.join("."))
    }
}

/// Memoised resolutions for one pipeline run.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, Option<String>>,
    hits: usize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

/// Per-pipeline state handed to a data builder.
#[derive(Debug)]
pub struct BuildContext<'a> {
    resolver: &'a dyn ModuleResolver,
    cache: ResolutionCache,
}

impl<'a> BuildContext<'a> {
    pub fn new(resolver: &'a dyn ModuleResolver) -> Self {
        Self {
            resolver,
            cache: ResolutionCache::new(),
        }
    }

    /// Module for a tool-reported path, [`UNKNOWN_MODULE`] when unresolvable.
    pub fn module_for(&mut self, path: &str) -> String {
        if let Some(cached) = self.cache.entries.get(path) {
            self.cache.hits += 1;
            return cached.clone().unwrap_or_else(|| UNKNOWN_MODULE.to_string());
        }
        let resolved = self.resolver.resolve(path);
        self.cache
            .entries
            .insert(path.to_string(), resolved.clone());
        resolved.unwrap_or_else(|| UNKNOWN_MODULE.to_string())
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }
}
