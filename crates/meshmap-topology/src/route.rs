//! Canonical bit-prefix routes.
//!
//! The wire protocol encodes a route label as dotted hex with the least
//! significant bit first. Canonicalization turns it into a plain `{0,1}`
//! string such that label A's node lies on the path to label B's node exactly
//! when A's canonical route is a prefix of B's.

use meshmap_wire::RawTableRow;
use thiserror::Error;

/// Scale factor between the raw link-state reading and link quality.
pub const LINK_STATE_MULTIPLIER: f64 = 5_366_870.0;

/// 4-bit expansion per hex digit, indexed by digit value.
const HEX_BITS: [&str; 16] = [
    "0000", "0001", "0010", "0011", "0100", "0101", "0110", "0111", "1000", "1001", "1010", "1011",
    "1100", "1101", "1110", "1111",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("path label `{label}` contains non-hex character `{found}`")]
    BadPathLabel { label: String, found: char },
}

/// Canonicalize a dotted-hex path label into a comparable bit-prefix.
///
/// The expansion is a digit-by-digit table lookup, so bits produced by one
/// digit can never be re-matched while expanding another. After expansion the
/// string is reversed (the wire order is least-significant-bit first), the
/// trailing zero padding is stripped, and the one remaining framing bit is
/// dropped. The result may be empty: the label that routes to the local node
/// canonicalizes to `""`, which makes it a prefix of every other route.
pub fn canonical_route(path: &str) -> Result<String, TopologyError> {
    let mut bits = String::with_capacity(path.len() * 4);
    for c in path.chars() {
        if c == '.' {
            continue;
        }
        let digit = c.to_digit(16).ok_or_else(|| TopologyError::BadPathLabel {
            label: path.to_string(),
            found: c,
        })?;
        bits.push_str(HEX_BITS[digit as usize]);
    }
    let reversed: String = bits.chars().rev().collect();
    let mut route = reversed.trim_end_matches('0').to_string();
    route.pop();
    Ok(route)
}

/// One table row with its canonical route and derived quality.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub ip: String,
    pub bits: String,
    pub quality: f64,
}

impl Route {
    pub fn from_row(row: &RawTableRow) -> Result<Route, TopologyError> {
        Ok(Route {
            ip: row.ip.clone(),
            bits: canonical_route(&row.path)?,
            quality: row.link as f64 / LINK_STATE_MULTIPLIER,
        })
    }

    /// Zero quality marks a historical link that is currently dead.
    pub fn is_active(&self) -> bool {
        self.quality > 0.0
    }
}
