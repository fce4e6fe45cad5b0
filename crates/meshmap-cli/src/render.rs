//! DOT emission and layout invocation.
//!
//! The styled descriptor lists are format-independent; this module maps them
//! to Graphviz DOT and, for image outputs, pipes the DOT text through the
//! external `fdp` layout engine.

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use meshmap_topology::StyledGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    Json,
    Svg,
    Png,
}

impl OutputFormat {
    /// Format from the output filename; anything unrecognized renders as PNG.
    pub fn from_path(path: &Path) -> OutputFormat {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("dot") => OutputFormat::Dot,
            Some("json") => OutputFormat::Json,
            Some("svg") => OutputFormat::Svg,
            _ => OutputFormat::Png,
        }
    }

    fn layout_flag(self) -> &'static str {
        match self {
            OutputFormat::Svg => "-Tsvg",
            _ => "-Tpng",
        }
    }
}

pub fn write_output(graph: &StyledGraph, path: &Path) -> Result<()> {
    match OutputFormat::from_path(path) {
        OutputFormat::Dot => {
            fs::write(path, to_dot(graph)).with_context(|| format!("writing {}", path.display()))
        }
        OutputFormat::Json => fs::write(path, serde_json::to_string_pretty(graph)?)
            .with_context(|| format!("writing {}", path.display())),
        format => layout(graph, path, format),
    }
}

/// Emit the undirected Graphviz graph with the force-directed layout
/// parameters tuned for mesh maps.
pub fn to_dot(graph: &StyledGraph) -> String {
    let mut out = String::new();
    out.push_str("graph meshmap {\n");
    out.push_str("  K=2;\n");
    out.push_str("  splines=true;\n");
    out.push_str("  dpi=50;\n");
    out.push_str("  maxiter=10000;\n");
    out.push_str("  ranksep=2;\n");
    out.push_str("  nodesep=1;\n");
    out.push_str("  epsilon=0.1;\n");
    out.push_str("  overlap=false;\n");
    out.push_str("  node [shape=box];\n\n");

    for node in &graph.nodes {
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\", color=\"{}\", fontcolor=\"{}\", style=filled, fillcolor=\"{}\"];",
            dot_escape(&node.id),
            dot_escape(&node.name),
            node.color,
            node.fontcolor,
            node.fillcolor,
        );
    }
    out.push('\n');

    for edge in &graph.edges {
        let _ = writeln!(
            out,
            "  \"{}\" -- \"{}\" [color=\"{}\", len={:.3}, minlen={:.3}, weight={}, style=\"setlinewidth({:.3})\"];",
            dot_escape(&edge.a),
            dot_escape(&edge.b),
            edge.color,
            edge.len,
            edge.minlen,
            edge.weight,
            edge.width,
        );
    }

    out.push_str("}\n");
    out
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn layout(graph: &StyledGraph, path: &Path, format: OutputFormat) -> Result<()> {
    let dot = to_dot(graph);
    let mut child = Command::new("fdp")
        .arg(format.layout_flag())
        .arg("-o")
        .arg(path)
        .stdin(Stdio::piped())
        .spawn()
        .context("launching the `fdp` layout engine (is graphviz installed?)")?;
    child
        .stdin
        .as_mut()
        .ok_or_else(|| anyhow!("fdp stdin unavailable"))?
        .write_all(dot.as_bytes())
        .context("piping DOT to fdp")?;
    let status = child.wait().context("waiting for fdp")?;
    if !status.success() {
        bail!("fdp exited with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmap_topology::{build, classify, NoNames};
    use meshmap_wire::RawTableRow;

    fn graph() -> StyledGraph {
        let rows = vec![
            RawTableRow {
                ip: "fc00:aa".to_string(),
                path: "01".to_string(),
                link: 10_000_000,
            },
            RawTableRow {
                ip: "fc00:bb".to_string(),
                path: "0100".to_string(),
                link: 0,
            },
        ];
        classify(&build(&rows, &NoNames).expect("valid rows"))
    }

    #[test]
    fn dot_output_contains_every_node_and_edge() {
        let dot = to_dot(&graph());
        assert!(dot.starts_with("graph meshmap {"));
        assert!(dot.contains("\"fc00:aa\""));
        assert!(dot.contains("\"fc00:bb\""));
        assert!(dot.contains("--"));
        assert!(dot.contains("setlinewidth("));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn inactive_edges_render_grey_and_short() {
        let dot = to_dot(&graph());
        assert!(dot.contains("color=\"grey\", len=0.500"));
    }

    #[test]
    fn quoted_identifiers_are_escaped() {
        let mut g = graph();
        g.nodes[0].name = "evil\"name".to_string();
        let dot = to_dot(&g);
        assert!(dot.contains("evil\\\"name"));
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("map.dot")),
            OutputFormat::Dot
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("map.JSON")),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("map.svg")),
            OutputFormat::Svg
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("map.png")),
            OutputFormat::Png
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("map")),
            OutputFormat::Png
        );
    }
}
