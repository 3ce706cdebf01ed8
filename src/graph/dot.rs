//! Graphviz DOT rendering of the module graph.

use super::GraphMetrics;
use std::collections::HashSet;
use std::fmt::Write;

/// DOT output configuration
#[derive(Debug, Clone)]
pub struct DotConfig {
    pub rankdir: RankDir,
    /// Color of edges that belong to an import cycle
    pub cycle_color: String,
    /// Draw isolated modules as well
    pub include_isolated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDir {
    TopBottom,
    LeftRight,
}

impl RankDir {
    fn as_str(&self) -> &'static str {
        match self {
            RankDir::TopBottom => "TB",
            RankDir::LeftRight => "LR",
        }
    }
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            rankdir: RankDir::LeftRight,
            cycle_color: "#c62828".to_string(),
            include_isolated: true,
        }
    }
}

fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render the graph. Output is deterministic for a given record.
pub fn render_dot(metrics: &GraphMetrics, config: &DotConfig) -> String {
    let cycle_members: Vec<HashSet<&str>> = metrics
        .cycles
        .iter()
        .map(|cycle| cycle.iter().map(String::as_str).collect())
        .collect();
    let in_cycle = |from: &str, to: &str| {
        cycle_members
            .iter()
            .any(|members| members.contains(from) && members.contains(to))
    };

    let mut out = String::new();
    let _ = writeln!(out, "digraph dependencies {{");
    let _ = writeln!(out, "    rankdir={};", config.rankdir.as_str());
    let _ = writeln!(out, "    node [shape=box, fontname=\"Helvetica\"];");

    let mut nodes: Vec<&str> = metrics
        .edges
        .iter()
        .flat_map(|e| [e.from.as_str(), e.to.as_str()])
        .collect();
    if config.include_isolated {
        nodes.extend(metrics.isolated.iter().map(String::as_str));
    }
    nodes.sort_unstable();
    nodes.dedup();

    for node in nodes {
        if cycle_members.iter().any(|members| members.contains(node)) {
            let _ = writeln!(out, "    {} [color=\"{}\"];", quote(node), config.cycle_color);
        } else {
            let _ = writeln!(out, "    {};", quote(node));
        }
    }

    for edge in &metrics.edges {
        let mut attrs = Vec::new();
        if edge.weight > 1 {
            attrs.push(format!("label=\"{}\"", edge.weight));
        }
        if in_cycle(&edge.from, &edge.to) {
            attrs.push(format!("color=\"{}\"", config.cycle_color));
            attrs.push("penwidth=2".to_string());
        }
        if attrs.is_empty() {
            let _ = writeln!(out, "    {} -> {};", quote(&edge.from), quote(&edge.to));
        } else {
            let _ = writeln!(
                out,
                "    {} -> {} [{}];",
                quote(&edge.from),
                quote(&edge.to),
                attrs.join(", ")
            );
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphThresholds;
    use crate::graph::DependencyGraph;

    #[test]
    fn test_cycle_edges_highlighted() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "a");
        graph.add_dependency("b", "c");
        graph.add_dependency("b", "c");
        let metrics = GraphMetrics::from_graph(&graph, &GraphThresholds::default(), "t");

        let dot = render_dot(&metrics, &DotConfig::default());
        assert!(dot.starts_with("digraph dependencies {"));
        assert!(dot.contains("\"a\" -> \"b\" [color=\"#c62828\", penwidth=2];"));
        assert!(dot.contains("\"b\" -> \"c\" [label=\"2\"];"));
        assert_eq!(dot, render_dot(&metrics, &DotConfig::default()));
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(quote("we\"ird"), "\"we\\\"ird\"");
    }
}
