//! Routing-topology reconstruction for mesh overlay networks.
//!
//! Given the decoded rows of a routing-table dump, this crate rebuilds the
//! spanning topology an operator can actually look at:
//!
//! - each route label is canonicalized into a comparable bit-prefix,
//! - every row's parent is inferred by longest matching prefix,
//! - links are deduplicated into a simple graph with quality-ranked
//!   strengths, and
//! - nodes and edges are classified into styled descriptors for an external
//!   layout engine.
//!
//! The crate performs no I/O. All state lives in a per-run [`Topology`]
//! value; nothing persists between invocations.

pub mod reconstruct;
pub mod route;
pub mod style;

pub use reconstruct::{build, find_parent, Edge, NameResolver, NoNames, Node, Topology};
pub use route::{canonical_route, Route, TopologyError, LINK_STATE_MULTIPLIER};
pub use style::{classify, EdgeDescriptor, NodeDescriptor, StyledGraph};
