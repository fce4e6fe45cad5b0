//! Meshmap CLI
//!
//! Queries an admin daemon for its routing-table dump, reconstructs the mesh
//! topology, and writes a map:
//! - `.dot`: Graphviz source for external tooling
//! - `.json`: styled node/edge descriptors for custom frontends
//! - `.svg` / `.png`: rendered through the `fdp` layout engine

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod admin;
mod feed;
mod render;

#[derive(Parser)]
#[command(name = "meshmap")]
#[command(
    author,
    version,
    about = "Map the spanning topology of a mesh-routed overlay network"
)]
struct Cli {
    /// Output file; format chosen by extension (.svg, .png, .dot, .json).
    #[arg(default_value = "map.svg")]
    output: PathBuf,

    /// Admin daemon address.
    #[arg(long)]
    addr: Option<String>,

    /// Admin daemon port.
    #[arg(long)]
    port: Option<u16>,

    /// Admin password; overrides the credentials file.
    #[arg(long)]
    password: Option<String>,

    /// Credentials file (JSON: {"addr": ..., "port": ..., "password": ...}).
    /// Defaults to ~/.meshmapadmin when no connection flags are given.
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL of a name feed (JSON or flat text).
    #[arg(long)]
    names_url: Option<String>,

    /// Local name-feed file (JSON or `ip name` lines).
    #[arg(long)]
    names_file: Option<PathBuf>,

    /// Skip name resolution entirely; nodes show their address suffix.
    #[arg(long)]
    no_names: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let credentials = admin::Credentials::resolve(
        cli.addr.as_deref(),
        cli.port,
        cli.password.as_deref(),
        cli.config.as_deref(),
    )?;

    println!(
        "{} {}:{}",
        "querying".green().bold(),
        credentials.addr,
        credentials.port
    );
    let mut session = admin::AdminSession::connect(&credentials)?;
    let rows = session.dump_all_pages()?;
    tracing::info!(rows = rows.len(), "routing table decoded");

    let resolver = feed::load_resolver(cli.no_names, cli.names_url.as_deref(), cli.names_file.as_deref());

    let topology = meshmap_topology::build(&rows, resolver.as_ref())?;
    if topology.is_empty() {
        tracing::warn!("routing table produced an empty topology");
        println!("{}", "no routes decoded; writing an empty map".yellow());
    }
    let graph = meshmap_topology::classify(&topology);

    println!(
        "{} {} nodes, {} edges",
        "reconstructed".green().bold(),
        graph.nodes.len(),
        graph.edges.len()
    );
    render::write_output(&graph, &cli.output)?;
    println!("{} {}", "wrote".green().bold(), cli.output.display());
    Ok(())
}
