//! Name-feed loading.
//!
//! A feed failure is never fatal: the run logs a warning and proceeds with
//! raw-address fallbacks.

use std::fs;
use std::path::Path;

use meshmap_names::NameTable;
use meshmap_topology::{NameResolver, NoNames};

pub fn load_resolver(
    no_names: bool,
    names_url: Option<&str>,
    names_file: Option<&Path>,
) -> Box<dyn NameResolver> {
    if no_names {
        return Box::new(NoNames);
    }
    if let Some(url) = names_url {
        match fetch_url(url) {
            Ok(table) => {
                tracing::info!(names = table.len(), url, "name feed loaded");
                return Box::new(table);
            }
            Err(err) => {
                tracing::warn!(%err, url, "name feed unavailable; continuing without names");
                return Box::new(NoNames);
            }
        }
    }
    if let Some(path) = names_file {
        match read_file(path) {
            Ok(table) => {
                tracing::info!(names = table.len(), path = %path.display(), "name feed loaded");
                return Box::new(table);
            }
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "name feed unreadable; continuing without names");
                return Box::new(NoNames);
            }
        }
    }
    Box::new(NoNames)
}

fn fetch_url(raw: &str) -> anyhow::Result<NameTable> {
    let url = url::Url::parse(raw)?;
    let text = reqwest::blocking::get(url)?.error_for_status()?.text()?;
    NameTable::parse(&text)
}

fn read_file(path: &Path) -> anyhow::Result<NameTable> {
    let text = fs::read_to_string(path)?;
    NameTable::parse(&text)
}
