//! Presentation classification: families, hues, and styled descriptors.
//!
//! The output is format-independent: ordered node and edge descriptor lists
//! with concrete colors and layout hints, handed to whichever collaborator
//! does the actual drawing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::reconstruct::Topology;

const ACTIVE_EDGE_COLOR: &str = "black";
const INACTIVE_EDGE_COLOR: &str = "grey";

/// Name-derived grouping: the name minus its first `.`-separated component.
/// A name without a separator belongs to no family.
pub fn family_of(name: &str) -> Option<String> {
    name.splitn(2, '.').nth(1).map(str::to_string)
}

/// A styled node, ready for the external renderer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeDescriptor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// False marks a node that is known but currently unreachable.
    pub active: bool,
    pub connections: u32,
    pub active_connections: u32,
    pub color: String,
    pub fontcolor: String,
    pub fillcolor: String,
}

/// A styled edge with layout hints for the external renderer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EdgeDescriptor {
    pub a: String,
    pub b: String,
    pub quality: f64,
    pub active: bool,
    pub color: String,
    /// Line width, `ln(quality + 1)` clamped to at least 1.
    pub width: f64,
    /// Preferred layout length; shorter means stronger for active edges.
    pub len: f64,
    pub minlen: f64,
    /// Layout weight; edges touching a degree-1 node get the maximum so
    /// leaves are not stretched.
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StyledGraph {
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
}

/// Evenly spaced hues over [0°, 360°) by lexicographic family order, so a
/// given family set colors identically on every run.
pub fn family_hues(topology: &Topology) -> BTreeMap<String, f64> {
    let families: BTreeSet<&str> = topology
        .nodes
        .iter()
        .filter_map(|n| n.family.as_deref())
        .collect();
    let step = 360.0 / families.len().max(1) as f64;
    families
        .into_iter()
        .enumerate()
        .map(|(i, family)| (family.to_string(), step * i as f64))
        .collect()
}

/// Assign style attributes to every node and edge of a reconstructed
/// topology.
pub fn classify(topology: &Topology) -> StyledGraph {
    let hues = family_hues(topology);
    let node_by_ip: HashMap<&str, &crate::reconstruct::Node> = topology
        .nodes
        .iter()
        .map(|n| (n.ip.as_str(), n))
        .collect();

    let nodes = topology
        .nodes
        .iter()
        .map(|n| {
            let active = n.active_connections > 0;
            let (color, fontcolor, fillcolor) = if active {
                let fill = match n.family.as_deref().and_then(|f| hues.get(f)) {
                    Some(&hue) => hsv_to_color(hue, 0.3, 1.0),
                    None => "white".to_string(),
                };
                ("black".to_string(), "black".to_string(), fill)
            } else {
                // Outline-only at lower saturation/value: known but
                // currently unreachable.
                let (h, s, v) = match n.family.as_deref().and_then(|f| hues.get(f)) {
                    Some(&hue) => (hue, 0.5, 0.7),
                    None => (0.0, 0.0, 0.6),
                };
                let color = hsv_to_color(h, s, v);
                (color.clone(), color, "white".to_string())
            };
            NodeDescriptor {
                id: n.ip.clone(),
                name: n.name.clone(),
                family: n.family.clone(),
                active,
                connections: n.connections,
                active_connections: n.active_connections,
                color,
                fontcolor,
                fillcolor,
            }
        })
        .collect();

    let edges = topology
        .edges
        .iter()
        .map(|e| {
            let width = (e.quality + 1.0).ln().max(1.0);
            let len = if e.active { 6.0 / width } else { 0.5 };
            let mut weight = if e.active { 1.0 } else { 0.01 };
            let degree_one = [e.a.as_str(), e.b.as_str()].iter().any(|ip| {
                node_by_ip
                    .get(ip)
                    .map(|n| n.connections == 1)
                    .unwrap_or(false)
            });
            if degree_one {
                weight = 1.0;
            }
            EdgeDescriptor {
                a: e.a.clone(),
                b: e.b.clone(),
                quality: e.quality,
                active: e.active,
                color: if e.active {
                    ACTIVE_EDGE_COLOR.to_string()
                } else {
                    INACTIVE_EDGE_COLOR.to_string()
                },
                width,
                len,
                minlen: 0.5,
                weight,
            }
        })
        .collect();

    StyledGraph { nodes, edges }
}

/// `h` in degrees, `s` and `v` in [0, 1].
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    let chroma = v * s;
    let h_dash = h / 60.0;
    let x = chroma * (1.0 - ((h_dash % 2.0) - 1.0).abs());

    let (r, g, b) = if h_dash < 1.0 {
        (chroma, x, 0.0)
    } else if h_dash < 2.0 {
        (x, chroma, 0.0)
    } else if h_dash < 3.0 {
        (0.0, chroma, x)
    } else if h_dash < 4.0 {
        (0.0, x, chroma)
    } else if h_dash < 5.0 {
        (x, 0.0, chroma)
    } else {
        (chroma, 0.0, x)
    };

    let m = v - chroma;
    (r + m, g + m, b + m)
}

pub fn hsv_to_color(h: f64, s: f64, v: f64) -> String {
    let (r, g, b) = hsv_to_rgb(h, s, v);
    format!(
        "#{:02x}{:02x}{:02x}",
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8
    )
}
