//! Internal import graph of a Python source tree.
//!
//! Modules are nodes, imports between known modules are weighted edges.
//! Cycles are the strongly connected components with more than one member.

pub mod dot;
pub mod imports;
pub mod walker;

use crate::config::{GraphThresholds, SourceConfig};
use crate::core::Status;
use crate::grading::{decide, GradeInput};
use imports::{extract_imports, ImportStatement};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use walker::{module_name, SourceWalker};

/// Directed module graph. Node weights are module names, edge weights are
/// the number of import statements behind the edge.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, usize>,
    index: HashMap<String, NodeIndex>,
    packages: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub weight: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCoupling {
    pub module: String,
    pub count: usize,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning its node. Adding a known module is a no-op.
    pub fn add_module(&mut self, module: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(module) {
            return idx;
        }
        let idx = self.graph.add_node(module.to_string());
        self.index.insert(module.to_string(), idx);
        idx
    }

    /// Add a module defined by a package `__init__.py`.
    pub fn add_package(&mut self, module: &str) -> NodeIndex {
        self.packages.insert(module.to_string());
        self.add_module(module)
    }

    pub fn is_package(&self, module: &str) -> bool {
        self.packages.contains(module)
    }

    /// Record one import of `to` by `from`. Self-imports are ignored.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let a = self.add_module(from);
        let b = self.add_module(to);
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] += 1,
            None => {
                self.graph.add_edge(a, b, 1);
            }
        }
    }

    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Distinct module pairs
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Sum of edge weights
    pub fn total_imports(&self) -> usize {
        self.graph.edge_weights().sum()
    }

    /// Modules in insertion order
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    pub fn in_degree(&self, module: &str) -> usize {
        self.degree(module, Direction::Incoming)
    }

    pub fn out_degree(&self, module: &str) -> usize {
        self.degree(module, Direction::Outgoing)
    }

    fn degree(&self, module: &str, direction: Direction) -> usize {
        self.index
            .get(module)
            .map(|&idx| self.graph.neighbors_directed(idx, direction).count())
            .unwrap_or(0)
    }

    /// Import cycles: every SCC with more than one member, members sorted,
    /// cycles ordered by the earliest-inserted member.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut components: Vec<(usize, Vec<String>)> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let first = scc.iter().map(|idx| idx.index()).min().unwrap_or(0);
                let mut members: Vec<String> =
                    scc.iter().map(|&idx| self.graph[idx].clone()).collect();
                members.sort();
                (first, members)
            })
            .collect();
        components.sort_by_key(|(first, _)| *first);
        components.into_iter().map(|(_, members)| members).collect()
    }

    /// Modules with neither incoming nor outgoing edges, sorted.
    pub fn isolated(&self) -> Vec<String> {
        let mut isolated: Vec<String> = self
            .modules()
            .filter(|module| self.in_degree(module) == 0 && self.out_degree(module) == 0)
            .map(str::to_string)
            .collect();
        isolated.sort();
        isolated
    }

    /// Most-imported modules, ties broken by name.
    pub fn fan_in(&self, top_n: usize) -> Vec<ModuleCoupling> {
        self.ranking(Direction::Incoming, top_n)
    }

    /// Modules importing the most others, ties broken by name.
    pub fn fan_out(&self, top_n: usize) -> Vec<ModuleCoupling> {
        self.ranking(Direction::Outgoing, top_n)
    }

    fn ranking(&self, direction: Direction, top_n: usize) -> Vec<ModuleCoupling> {
        let mut ranked: Vec<ModuleCoupling> = self
            .graph
            .node_indices()
            .map(|idx| ModuleCoupling {
                module: self.graph[idx].clone(),
                count: self.graph.neighbors_directed(idx, direction).count(),
            })
            .filter(|c| c.count > 0)
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.module.cmp(&b.module)));
        ranked.truncate(top_n);
        ranked
    }

    /// All edges sorted by source then target
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edge_references()
            .map(|edge| DependencyEdge {
                from: self.graph[edge.source()].clone(),
                to: self.graph[edge.target()].clone(),
                weight: *edge.weight(),
            })
            .collect();
        edges.sort();
        edges
    }
}

/// Graph metrics persisted for the dependency category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub status: Status,
    pub configured: bool,
    pub source: String,
    pub module_count: usize,
    pub edge_count: usize,
    pub total_imports: usize,
    pub cycles: Vec<Vec<String>>,
    /// Isolated modules that are neither packages nor matched by an
    /// entry-point pattern
    pub isolated: Vec<String>,
    pub max_isolated: usize,
    pub fan_in: Vec<ModuleCoupling>,
    pub fan_out: Vec<ModuleCoupling>,
    pub average_fan_out: f64,
    pub skipped_files: Vec<String>,
    pub edges: Vec<DependencyEdge>,
    pub diagnostics: Vec<String>,
}

impl GraphMetrics {
    pub fn grade_input(&self) -> GradeInput {
        if !self.configured {
            return GradeInput::not_configured();
        }
        if self.module_count == 0 {
            return GradeInput::no_data();
        }
        GradeInput::counts(self.cycles.len(), self.isolated.len())
            .with_allowance(self.max_isolated)
    }

    pub fn not_configured(source: &str, reason: &str) -> Self {
        let mut metrics = Self {
            status: Status::NotConfigured,
            configured: false,
            source: source.to_string(),
            module_count: 0,
            edge_count: 0,
            total_imports: 0,
            cycles: Vec::new(),
            isolated: Vec::new(),
            max_isolated: 0,
            fan_in: Vec::new(),
            fan_out: Vec::new(),
            average_fan_out: 0.0,
            skipped_files: Vec::new(),
            edges: Vec::new(),
            diagnostics: vec![reason.to_string()],
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }

    /// Metrics for an already built graph.
    pub fn from_graph(graph: &DependencyGraph, thresholds: &GraphThresholds, source: &str) -> Self {
        let patterns = compile_entry_points(&thresholds.entry_points);
        let isolated: Vec<String> = graph
            .isolated()
            .into_iter()
            .filter(|module| !graph.is_package(module))
            .filter(|module| !patterns.iter().any(|p| p.matches(module)))
            .collect();

        let module_count = graph.module_count();
        let edge_count = graph.edge_count();
        let mut metrics = Self {
            status: Status::NoData,
            configured: true,
            source: source.to_string(),
            module_count,
            edge_count,
            total_imports: graph.total_imports(),
            cycles: graph.cycles(),
            isolated,
            max_isolated: thresholds.max_isolated,
            fan_in: graph.fan_in(thresholds.top_n),
            fan_out: graph.fan_out(thresholds.top_n),
            average_fan_out: crate::builders::round1(crate::builders::ratio(
                edge_count as f64,
                module_count as f64,
            )),
            skipped_files: Vec::new(),
            edges: graph.edges(),
            diagnostics: Vec::new(),
        };
        metrics.status = decide(&metrics.grade_input());
        metrics
    }
}

fn compile_entry_points(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("ignoring invalid entry point pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

/// Module whose imports are being resolved.
struct Importer<'a> {
    name: &'a str,
    is_package: bool,
}

impl Importer<'_> {
    /// Package a relative import of `level` dots starts from.
    fn anchor(&self, level: usize) -> Option<Vec<&str>> {
        let mut parts: Vec<&str> = self.name.split('.').collect();
        if !self.is_package {
            parts.pop();
        }
        for _ in 1..level {
            parts.pop()?;
        }
        Some(parts)
    }
}

fn longest_known_prefix(name: &str, known: &HashSet<String>) -> Option<String> {
    let parts: Vec<&str> = name.split('.').collect();
    (1..=parts.len())
        .rev()
        .map(|n| parts[..n].join("."))
        .find(|candidate| known.contains(candidate))
}

/// Internal modules an import statement refers to. External and
/// unresolvable imports yield nothing.
fn resolve_import(
    importer: &Importer<'_>,
    statement: &ImportStatement,
    known: &HashSet<String>,
) -> BTreeSet<String> {
    let mut targets = BTreeSet::new();
    match statement {
        ImportStatement::Import { module } => {
            if let Some(target) = longest_known_prefix(module, known) {
                targets.insert(target);
            }
        }
        ImportStatement::From {
            level,
            module,
            names,
        } => {
            let base = if *level == 0 {
                module.clone().unwrap_or_default()
            } else {
                let Some(mut parts) = importer.anchor(*level) else {
                    debug!("{}: relative import escapes the source root", importer.name);
                    return targets;
                };
                if let Some(module) = module {
                    parts.push(module);
                }
                parts.join(".")
            };
            if base.is_empty() {
                for name in names {
                    if known.contains(name) {
                        targets.insert(name.clone());
                    }
                }
                return targets;
            }
            for name in names {
                let candidate = format!("{base}.{name}");
                if known.contains(&candidate) {
                    targets.insert(candidate);
                } else if let Some(target) = longest_known_prefix(&base, known) {
                    targets.insert(target);
                }
            }
            if names.is_empty() {
                if let Some(target) = longest_known_prefix(&base, known) {
                    targets.insert(target);
                }
            }
        }
    }
    targets
}

/// Scans a source tree and builds its module graph.
pub struct GraphBuilder {
    root: PathBuf,
    excluded_dirs: Vec<String>,
    thresholds: GraphThresholds,
}

struct SourceModule {
    name: String,
    path: PathBuf,
    is_package: bool,
}

impl GraphBuilder {
    pub fn new(root: &Path, source: &SourceConfig, thresholds: GraphThresholds) -> Self {
        Self {
            root: root.to_path_buf(),
            excluded_dirs: source.excluded_dirs(),
            thresholds,
        }
    }

    fn discover(&self) -> Vec<SourceModule> {
        SourceWalker::new(&self.root)
            .with_excluded_dirs(self.excluded_dirs.clone())
            .walk()
            .into_iter()
            .filter_map(|path| {
                let name = module_name(&self.root, &path)?;
                let is_package = path.file_stem().is_some_and(|stem| stem == "__init__");
                Some(SourceModule {
                    name,
                    path,
                    is_package,
                })
            })
            .collect()
    }

    /// Scan the tree. Unreadable or unparsable files are skipped and listed.
    pub fn build(&self) -> (DependencyGraph, Vec<String>) {
        let modules = self.discover();
        let known: HashSet<String> = modules.iter().map(|m| m.name.clone()).collect();

        let parsed: Vec<(&SourceModule, Result<Vec<ImportStatement>, String>)> = modules
            .par_iter()
            .map(|module| {
                let imports = std::fs::read(&module.path)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        let source = String::from_utf8_lossy(&bytes);
                        extract_imports(&source, &module.path.display().to_string())
                            .map_err(|e| e.to_string())
                    });
                (module, imports)
            })
            .collect();

        let mut graph = DependencyGraph::new();
        let mut skipped = Vec::new();
        for module in &modules {
            if module.is_package {
                graph.add_package(&module.name);
            } else {
                graph.add_module(&module.name);
            }
        }
        for (module, imports) in parsed {
            let statements = match imports {
                Ok(statements) => statements,
                Err(reason) => {
                    warn!("skipping {}: {}", module.path.display(), reason);
                    skipped.push(self.display_path(&module.path));
                    continue;
                }
            };
            let importer = Importer {
                name: &module.name,
                is_package: module.is_package,
            };
            for statement in &statements {
                for target in resolve_import(&importer, statement, &known) {
                    graph.add_dependency(&module.name, &target);
                }
            }
        }
        (graph, skipped)
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// Full analysis of the source tree as a metric record.
    pub fn analyze(&self) -> GraphMetrics {
        let source = self.root.display().to_string();
        if !self.root.is_dir() {
            warn!("source root {} is not a directory", source);
            return GraphMetrics::not_configured(&source, "source root does not exist");
        }

        let (graph, skipped_files) = self.build();
        let mut metrics = GraphMetrics::from_graph(&graph, &self.thresholds, &source);
        if !skipped_files.is_empty() {
            metrics.diagnostics.push(format!(
                "{} files could not be parsed and were skipped",
                skipped_files.len()
            ));
        }
        metrics.skipped_files = skipped_files;
        info!(
            "scanned {} modules, {} edges, {} cycles",
            metrics.module_count,
            metrics.edge_count,
            metrics.cycles.len()
        );
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn graph_of(edges: &[(&str, &str)], modules: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for module in modules {
            graph.add_module(module);
        }
        for (from, to) in edges {
            graph.add_dependency(from, to);
        }
        graph
    }

    #[test]
    fn test_two_cycle_and_isolated_module() {
        let graph = graph_of(&[("A", "B"), ("B", "A")], &["A", "B", "C"]);
        assert_eq!(graph.cycles(), vec![vec!["A".to_string(), "B".to_string()]]);
        assert_eq!(graph.isolated(), vec!["C".to_string()]);
        for member in ["A", "B"] {
            assert!(graph.in_degree(member) >= 1);
            assert!(graph.out_degree(member) >= 1);
        }
        assert_eq!((graph.in_degree("C"), graph.out_degree("C")), (0, 0));

        let metrics = GraphMetrics::from_graph(&graph, &GraphThresholds::default(), "t");
        assert_eq!(metrics.status, Status::Fail);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("A", "C")], &[]);
        assert!(graph.cycles().is_empty());
        let metrics = GraphMetrics::from_graph(&graph, &GraphThresholds::default(), "t");
        assert_ne!(metrics.status, Status::Fail);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_self_loop_excluded() {
        let graph = graph_of(&[("A", "A")], &[]);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.cycles().is_empty());
        assert_eq!(graph.isolated(), vec!["A".to_string()]);
    }

    #[test]
    fn test_repeated_imports_raise_weight() {
        let graph = graph_of(&[("A", "B"), ("A", "B"), ("A", "B")], &[]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.total_imports(), 3);
        assert_eq!(graph.edges()[0].weight, 3);
    }

    #[test]
    fn test_cycles_ordered_by_first_member() {
        let graph = graph_of(
            &[("x", "y"), ("y", "x"), ("b", "a"), ("a", "b")],
            &["x", "y", "a", "b"],
        );
        let cycles = graph.cycles();
        assert_eq!(cycles[0], vec!["x".to_string(), "y".to_string()]);
        assert_eq!(cycles[1], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_fan_rankings_break_ties_by_name() {
        let graph = graph_of(
            &[("a", "core"), ("b", "core"), ("a", "util"), ("b", "util"), ("a", "b")],
            &[],
        );
        let fan_in = graph.fan_in(2);
        assert_eq!(fan_in[0].module, "core");
        assert_eq!(fan_in[1].module, "util");
        assert_eq!(fan_in[0].count, 2);
        let fan_out = graph.fan_out(10);
        assert_eq!(fan_out[0], ModuleCoupling { module: "a".into(), count: 3 });
    }

    #[test]
    fn test_isolation_threshold_and_entry_points() {
        let graph = graph_of(&[], &["app.__main__", "m1", "m2"]);
        let thresholds = GraphThresholds {
            max_isolated: 1,
            ..Default::default()
        };
        let metrics = GraphMetrics::from_graph(&graph, &thresholds, "t");
        assert_eq!(metrics.isolated, vec!["m1".to_string(), "m2".to_string()]);
        assert_eq!(metrics.status, Status::Warn);
    }

    #[test]
    fn test_resolve_relative_and_from_imports() {
        let known: HashSet<String> = ["shop", "shop.cart", "shop.orders", "billing.invoice"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let importer = Importer {
            name: "shop.orders",
            is_package: false,
        };

        let relative = ImportStatement::From {
            level: 1,
            module: None,
            names: vec!["cart".into()],
        };
        assert_eq!(
            resolve_import(&importer, &relative, &known).into_iter().collect::<Vec<_>>(),
            vec!["shop.cart".to_string()]
        );

        let symbol = ImportStatement::From {
            level: 0,
            module: Some("shop.cart".into()),
            names: vec!["Cart".into()],
        };
        assert_eq!(
            resolve_import(&importer, &symbol, &known).into_iter().collect::<Vec<_>>(),
            vec!["shop.cart".to_string()]
        );

        let external = ImportStatement::Import { module: "requests.adapters".into() };
        assert!(resolve_import(&importer, &external, &known).is_empty());

        let too_far = ImportStatement::From {
            level: 4,
            module: None,
            names: vec!["x".into()],
        };
        assert!(resolve_import(&importer, &too_far, &known).is_empty());
    }

    #[test]
    fn test_scan_source_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("shop")).unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("shop/__init__.py"), "").unwrap();
        fs::write(root.join("shop/cart.py"), "from shop import orders\nimport os\n").unwrap();
        fs::write(root.join("shop/orders.py"), "from .cart import Cart\n").unwrap();
        fs::write(root.join("shop/broken.py"), "def (:\n").unwrap();
        fs::write(root.join("tests/test_cart.py"), "import shop.cart\n").unwrap();

        let builder = GraphBuilder::new(root, &SourceConfig::default(), GraphThresholds::default());
        let metrics = builder.analyze();

        assert_eq!(metrics.module_count, 5);
        assert_eq!(metrics.cycles, vec![vec!["shop.cart".to_string(), "shop.orders".to_string()]]);
        assert_eq!(metrics.skipped_files.len(), 1);
        assert!(metrics.skipped_files[0].ends_with("broken.py"));
        assert_eq!(metrics.status, Status::Fail);
        assert!(metrics
            .edges
            .iter()
            .any(|e| e.from == "tests.test_cart" && e.to == "shop.cart"));
    }

    #[test]
    fn test_package_init_is_not_isolated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("pkg/a.py"), "import pkg.b
").unwrap();
        fs::write(root.join("pkg/b.py"), "").unwrap();
        fs::write(root.join("orphan.py"), "").unwrap();

        let builder = GraphBuilder::new(root, &SourceConfig::default(), GraphThresholds::default());
        let (graph, _) = builder.build();
        assert!(graph.is_package("pkg"));
        assert!(graph.isolated().contains(&"pkg".to_string()));

        let metrics = builder.analyze();
        assert_eq!(metrics.module_count, 4);
        assert_eq!(metrics.isolated, vec!["orphan".to_string()]);
        assert_eq!(metrics.status, Status::Pass);
    }

    #[test]
    fn test_missing_root_is_not_configured() {
        let builder = GraphBuilder::new(
            Path::new("/definitely/not/here"),
            &SourceConfig::default(),
            GraphThresholds::default(),
        );
        assert_eq!(builder.analyze().status, Status::NotConfigured);
    }
}
