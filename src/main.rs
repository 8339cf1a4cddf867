//! cratedigger - a music collection consolidation tool.
//!
//! Scans scattered source trees into a SQLite staging store, finds likely
//! duplicates through layered evidence (content hashes, acoustic
//! fingerprints, normalized metadata), and executes staged deletions
//! behind locks, caps, and dry runs.

pub mod alias;
pub mod apply;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod scanner;
pub mod store;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("cratedigger=info".parse().unwrap()))
        .init();

    cli::run_command(&args)
}
