//! Name-feed parsing and resolution.
//!
//! Two feed shapes are understood:
//! - JSON: `{ "nodes": [ {"ip": ..., "name": ...}, ... ] }`
//! - flat text: one `ip name` pair per line; `#` comments and blank lines
//!   are ignored, lines with fewer than two fields are skipped
//!
//! Duplicate display names are disambiguated by appending the last
//! `:`-delimited segment of the address, applied to every holder of a
//! duplicated name, so no two nodes render identically.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use serde::Deserialize;

use meshmap_topology::NameResolver;

#[derive(Debug, Deserialize)]
struct Feed {
    nodes: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    ip: String,
    name: String,
}

/// Address → display-name table built from a feed.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<String, String>,
}

impl NameTable {
    pub fn from_json(text: &str) -> Result<NameTable> {
        let feed: Feed = serde_json::from_str(text).context("name feed is not valid JSON")?;
        Ok(NameTable::from_entries(
            feed.nodes.into_iter().map(|e| (e.ip, e.name)),
        ))
    }

    pub fn from_text(text: &str) -> NameTable {
        let entries = text.lines().filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(ip), Some(name)) => Some((ip.to_string(), name.to_string())),
                _ => None,
            }
        });
        NameTable::from_entries(entries)
    }

    /// Auto-detect the feed shape: JSON feeds start with `{`.
    pub fn parse(text: &str) -> Result<NameTable> {
        if text.trim_start().starts_with('{') {
            NameTable::from_json(text)
        } else {
            Ok(NameTable::from_text(text))
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> NameTable {
        let entries: Vec<(String, String)> = entries.into_iter().collect();

        // Two-phase: find duplicated names first, then suffix every holder.
        let mut seen = HashSet::new();
        let mut doubles = HashSet::new();
        for (_, name) in &entries {
            if !seen.insert(name.clone()) {
                doubles.insert(name.clone());
            }
        }

        let mut names = HashMap::new();
        for (ip, name) in entries {
            let display = if doubles.contains(&name) {
                format!("{} {}", name, address_suffix(&ip))
            } else {
                name
            };
            names.insert(ip, display);
        }
        NameTable { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameResolver for NameTable {
    fn resolve(&self, ip: &str) -> Option<String> {
        self.names.get(ip).cloned()
    }
}

/// Last `:`-delimited segment of an address.
fn address_suffix(ip: &str) -> &str {
    ip.rsplit(':').next().unwrap_or(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_feed_round_trips() {
        let table = NameTable::from_json(
            r#"{"nodes": [{"ip": "fc00::1", "name": "alpha"}, {"ip": "fc00::2", "name": "beta"}]}"#,
        )
        .expect("valid feed");
        assert_eq!(table.resolve("fc00::1"), Some("alpha".to_string()));
        assert_eq!(table.resolve("fc00::2"), Some("beta".to_string()));
        assert_eq!(table.resolve("fc00::3"), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(NameTable::from_json("{\"nodes\": [{\"ip\": 3}]}").is_err());
    }

    #[test]
    fn text_feed_skips_comments_blanks_and_short_lines() {
        let table = NameTable::from_text(
            "# comment\n\nfc00:1 alpha\nlonely\nfc00:2 beta extra-ignored\n",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("fc00:1"), Some("alpha".to_string()));
        assert_eq!(table.resolve("fc00:2"), Some("beta".to_string()));
        assert_eq!(table.resolve("lonely"), None);
    }

    #[test]
    fn duplicate_names_suffix_every_holder() {
        let table = NameTable::from_text("fc00:aa:01 gateway\nfc00:bb:02 gateway\nfc00:cc:03 solo\n");
        assert_eq!(table.resolve("fc00:aa:01"), Some("gateway 01".to_string()));
        assert_eq!(table.resolve("fc00:bb:02"), Some("gateway 02".to_string()));
        assert_eq!(table.resolve("fc00:cc:03"), Some("solo".to_string()));
    }

    #[test]
    fn parse_auto_detects_the_feed_shape() {
        let json = NameTable::parse(r#"{"nodes": [{"ip": "a", "name": "n"}]}"#).expect("json");
        assert_eq!(json.resolve("a"), Some("n".to_string()));

        let text = NameTable::parse("a n\n").expect("text");
        assert_eq!(text.resolve("a"), Some("n".to_string()));
    }
}
