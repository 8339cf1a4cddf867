//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `store`: activate / list / status
//! - `ingest`: source scanning
//! - `clusters`: duplicate cluster reports
//! - `apply`: delete staging, the apply executor, run reports

mod apply;
mod clusters;
mod ingest;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::ingest::{IngestMode, MergePolicy};

pub use apply::{cmd_apply, cmd_mark_delete, cmd_report, cmd_unmark_delete};
pub use clusters::cmd_clusters;
pub use ingest::cmd_scan;
pub use store::{cmd_activate, cmd_list, cmd_status};

/// cratedigger CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Set the active staging store
    Activate {
        /// Path to the store file (created on first scan if absent)
        #[arg(long)]
        db: PathBuf,
    },
    /// Scan a source tree into the staging store
    Scan {
        /// Source directory to scan
        src: PathBuf,
        /// Library root used for recommended destination paths
        #[arg(long)]
        lib: Option<PathBuf>,
        /// Pipeline mode (defaults to the configured mode)
        #[arg(long, value_enum)]
        mode: Option<IngestMode>,
        /// Keep existing values; observations only fill gaps
        #[arg(long)]
        no_overwrite: bool,
        /// Compute acoustic fingerprints (requires fpcalc)
        #[arg(long)]
        fingerprint: bool,
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List all tracks in the staging store
    List {
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show duplicate clusters
    Clusters {
        /// Minimum cluster size
        #[arg(long, default_value_t = 2)]
        min_size: usize,
        /// Print summary statistics instead of full clusters
        #[arg(long)]
        stats: bool,
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Flag tracks as delete candidates
    MarkDelete {
        /// Track ids to flag
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Clear the delete-candidate flag on tracks
    UnmarkDelete {
        /// Track ids to unflag
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Execute (or simulate) staged deletions
    Apply {
        /// Plan and report only; touch nothing
        #[arg(long)]
        dry_run: bool,
        /// Allow deletions to execute
        #[arg(long)]
        apply_deletions: bool,
        /// Delete permanently instead of quarantining
        #[arg(long)]
        permanent: bool,
        /// Skip the interactive confirmation for --permanent
        #[arg(long)]
        yes: bool,
        /// Abort if delete candidates exceed this count
        #[arg(long)]
        max_delete: Option<u32>,
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show an apply run report (latest by default)
    Report {
        /// Specific run id to show
        #[arg(long)]
        run_id: Option<String>,
        /// Store to use instead of the active one
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show active store, lock state and last run
    Status,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Activate { db } => cmd_activate(db),
        Commands::Scan {
            src,
            lib,
            mode,
            no_overwrite,
            fingerprint,
            db,
        } => {
            let policy = if *no_overwrite {
                Some(MergePolicy::FillMissingOnly)
            } else {
                None
            };
            cmd_scan(
                &rt,
                src,
                lib.as_deref(),
                *mode,
                policy,
                *fingerprint,
                db.as_deref(),
            )
        }
        Commands::List { db } => cmd_list(&rt, db.as_deref()),
        Commands::Clusters { min_size, stats, db } => {
            cmd_clusters(&rt, *min_size, *stats, db.as_deref())
        }
        Commands::MarkDelete { ids, db } => cmd_mark_delete(&rt, ids, db.as_deref()),
        Commands::UnmarkDelete { ids, db } => cmd_unmark_delete(&rt, ids, db.as_deref()),
        Commands::Apply {
            dry_run,
            apply_deletions,
            permanent,
            yes,
            max_delete,
            db,
        } => cmd_apply(
            &rt,
            *dry_run,
            *apply_deletions,
            *permanent,
            *yes,
            *max_delete,
            db.as_deref(),
        ),
        Commands::Report { run_id, db } => cmd_report(run_id.as_deref(), db.as_deref()),
        Commands::Status => cmd_status(),
    }
}
