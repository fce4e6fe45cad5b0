//! Topology reconstruction from canonical routes.
//!
//! Reconstruction is a batch over all rows of a dump (all pages merged):
//!
//! 1. rows are stably sorted by quality, best first, so the first sighting of
//!    a node comes from its best-quality observation;
//! 2. each row's parent is the row with the longest canonical route that
//!    prefixes it;
//! 3. edges are formed in two passes, active links first, so a pair that was
//!    ever seen live is rendered live even when historical rows also cover it.

use std::collections::BTreeMap;
use std::collections::HashMap;

use meshmap_wire::RawTableRow;

use crate::route::{Route, TopologyError};
use crate::style::family_of;

/// Maps a node address to a human display name.
///
/// A miss is not an error; the node falls back to a deterministic suffix of
/// its address.
pub trait NameResolver {
    fn resolve(&self, ip: &str) -> Option<String>;
}

/// Explicit "no names available": every lookup misses and the run proceeds
/// with raw-address fallbacks.
pub struct NoNames;

impl NameResolver for NoNames {
    fn resolve(&self, _ip: &str) -> Option<String> {
        None
    }
}

/// One node per distinct address seen across all rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub ip: String,
    pub name: String,
    /// Name-derived grouping, presentation only.
    pub family: Option<String>,
    /// Distinct neighbor edges, both passes.
    pub connections: u32,
    /// Distinct neighbor edges formed from live rows.
    pub active_connections: u32,
}

/// One rendered link between two distinct nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Parent endpoint address.
    pub a: String,
    /// Child endpoint address.
    pub b: String,
    /// Quality of the row that produced the edge.
    pub quality: f64,
    pub active: bool,
}

/// The reconstructed graph: a per-run value, never shared or persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    /// Creation order: first sighting in quality-descending row order.
    pub nodes: Vec<Node>,
    /// Active-pass edges first, then inactive-pass edges.
    pub edges: Vec<Edge>,
    /// Best observed quality per unordered endpoint pair.
    pub link_strength: BTreeMap<(String, String), f64>,
}

impl Topology {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reconstruct the topology from merged dump rows.
///
/// Zero rows yield an empty topology; the caller decides how loudly to report
/// that.
pub fn build(rows: &[RawTableRow], resolver: &dyn NameResolver) -> Result<Topology, TopologyError> {
    let mut routes = rows
        .iter()
        .map(Route::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    // Stable: rows of equal quality keep their dump order.
    routes.sort_by(|a, b| b.quality.total_cmp(&a.quality));

    let mut topology = Topology::default();
    let mut node_index: HashMap<String, usize> = HashMap::new();
    for route in &routes {
        if node_index.contains_key(&route.ip) {
            continue;
        }
        let name = resolver
            .resolve(&route.ip)
            .unwrap_or_else(|| fallback_name(&route.ip).to_string());
        node_index.insert(route.ip.clone(), topology.nodes.len());
        topology.nodes.push(Node {
            ip: route.ip.clone(),
            family: family_of(&name),
            name,
            connections: 0,
            active_connections: 0,
        });
    }

    let parents: Vec<Option<usize>> = (0..routes.len())
        .map(|i| find_parent(&routes, i))
        .collect();

    add_edges(&mut topology, &node_index, &routes, &parents, true);
    add_edges(&mut topology, &node_index, &routes, &parents, false);
    Ok(topology)
}

/// Deterministic display-name fallback: the last `:`-delimited segment of the
/// address.
pub fn fallback_name(ip: &str) -> &str {
    ip.rsplit(':').next().unwrap_or(ip)
}

/// Find the parent row of `routes[i]`: among all other rows whose canonical
/// route is a prefix of this one (excluded by index, not by value, so
/// duplicate observations of one link still qualify for each other), the one
/// with the longest route. Equal lengths break by ascending address. `None`
/// means the row's node is a forest root for its pass.
pub fn find_parent(routes: &[Route], i: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (j, other) in routes.iter().enumerate() {
        if j == i || !routes[i].bits.starts_with(&other.bits) {
            continue;
        }
        best = match best {
            None => Some(j),
            Some(k) => {
                let held = &routes[k];
                let longer = other.bits.len() > held.bits.len();
                let tie_wins = other.bits.len() == held.bits.len() && other.ip < held.ip;
                if longer || tie_wins {
                    Some(j)
                } else {
                    Some(k)
                }
            }
        };
    }
    best
}

fn add_edges(
    topology: &mut Topology,
    node_index: &HashMap<String, usize>,
    routes: &[Route],
    parents: &[Option<usize>],
    active: bool,
) {
    for (i, route) in routes.iter().enumerate() {
        if route.is_active() != active {
            continue;
        }
        let Some(parent) = parents[i] else {
            continue;
        };
        let parent_ip = &routes[parent].ip;
        if *parent_ip == route.ip {
            // A node observed as its own ancestor carries no link information.
            continue;
        }
        let pair = ordered_pair(parent_ip, &route.ip);
        // Linked in *any* prior pass suppresses a second rendered edge; the
        // active pass runs first and wins the appearance.
        if !topology.link_strength.contains_key(&pair) {
            let (Some(&pi), Some(&ri)) = (node_index.get(parent_ip), node_index.get(&route.ip))
            else {
                continue;
            };
            topology.nodes[pi].connections += 1;
            topology.nodes[ri].connections += 1;
            if active {
                topology.nodes[pi].active_connections += 1;
                topology.nodes[ri].active_connections += 1;
            }
            topology.edges.push(Edge {
                a: parent_ip.clone(),
                b: route.ip.clone(),
                quality: route.quality,
                active,
            });
        }
        let strength = topology.link_strength.entry(pair).or_insert(route.quality);
        if route.quality > *strength {
            *strength = route.quality;
        }
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(ip: &str, bits: &str, quality: f64) -> Route {
        Route {
            ip: ip.to_string(),
            bits: bits.to_string(),
            quality,
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let routes = vec![
            route("root", "", 1.0),
            route("mid", "1010", 1.0),
            route("leaf", "1010110", 1.0),
        ];
        assert_eq!(find_parent(&routes, 2), Some(1));
        assert_eq!(find_parent(&routes, 1), Some(0));
        assert_eq!(find_parent(&routes, 0), None);
    }

    #[test]
    fn equal_length_tie_breaks_by_ascending_address() {
        let routes = vec![
            route("zeta", "10", 1.0),
            route("alpha", "10", 1.0),
            route("leaf", "10110", 1.0),
        ];
        assert_eq!(find_parent(&routes, 2), Some(1));
    }

    #[test]
    fn duplicate_route_values_qualify_for_each_other() {
        // Same canonical route observed twice: excluded by index, not value.
        let routes = vec![route("a", "101", 1.0), route("b", "101", 1.0)];
        assert_eq!(find_parent(&routes, 0), Some(1));
        assert_eq!(find_parent(&routes, 1), Some(0));
    }

    #[test]
    fn fallback_name_is_the_last_colon_segment() {
        assert_eq!(fallback_name("fc00:aa:bb:7535"), "7535");
        assert_eq!(fallback_name("plainname"), "plainname");
    }
}
