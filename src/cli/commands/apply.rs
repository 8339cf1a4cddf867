//! Delete staging, the apply executor, and run reports.

use std::io::Write;
use std::path::Path;
use tokio::runtime::Runtime;

use crate::apply::{self, report, ApplyContext, ApplyOptions};
use crate::config;
use crate::error::Error;
use crate::store;
use crate::store::active;

/// Typed phrase required before a permanent run proceeds interactively.
const PERMANENT_CONFIRMATION: &str = "DELETE PERMANENTLY";

/// Flag tracks as delete candidates
pub fn cmd_mark_delete(rt: &Runtime, ids: &[i64], db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let store_path = active::resolve_store(db)?;
        let pool = store::open_store(&store_path).await?;
        for &id in ids {
            if store::mark_delete(&pool, id).await? {
                println!("Marked {id} for deletion");
            } else {
                println!("No track with id {id}");
            }
        }
        Ok(())
    })
}

/// Clear the delete-candidate flag on tracks
pub fn cmd_unmark_delete(rt: &Runtime, ids: &[i64], db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let store_path = active::resolve_store(db)?;
        let pool = store::open_store(&store_path).await?;
        for &id in ids {
            if store::unmark_delete(&pool, id).await? {
                println!("Unmarked {id}");
            } else {
                println!("No track with id {id}");
            }
        }
        Ok(())
    })
}

fn prompt_permanent_confirmation() -> anyhow::Result<bool> {
    print!("This will PERMANENTLY delete files. Type '{PERMANENT_CONFIRMATION}' to proceed: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == PERMANENT_CONFIRMATION)
}

/// Execute (or simulate) staged deletions
pub fn cmd_apply(
    rt: &Runtime,
    dry_run: bool,
    apply_deletions: bool,
    permanent: bool,
    yes: bool,
    max_delete: Option<u32>,
    db: Option<&Path>,
) -> anyhow::Result<()> {
    let result: Result<report::ApplyRunReport, Error> = rt.block_on(async {
        let cfg = config::load();
        let store_path = active::resolve_store(db)?;
        let pool = store::open_store(&store_path).await?;

        // Interactive confirmation whenever --permanent is requested
        // without --yes, dry runs included
        let mut confirm_permanent = yes;
        if permanent && !yes {
            let candidates = store::delete_candidates(&pool).await?;
            if candidates.is_empty() {
                confirm_permanent = true;
            } else {
                confirm_permanent = prompt_permanent_confirmation().map_err(|e| {
                    Error::internal(format!("failed to read confirmation: {e}"))
                })?;
                if !confirm_permanent {
                    return Err(Error::validation("permanent deletion not confirmed"));
                }
            }
        }

        let locks_dir = config::locks_dir()
            .ok_or_else(|| Error::precondition("could not determine config directory"))?;
        let ctx = ApplyContext {
            locks_dir,
            quarantine_root: config::ensure_quarantine_exists(&cfg.apply)?,
            reports_dir: report::reports_dir(&store_path),
        };
        let opts = ApplyOptions {
            apply_deletions,
            permanent,
            confirm_permanent,
            dry_run,
            max_delete: max_delete.or(cfg.apply.max_delete),
        };

        apply::run_apply(&pool, &ctx, opts).await
    });

    match result {
        Ok(run_report) => {
            println!("{}", serde_json::to_string_pretty(&run_report)?);
            Ok(())
        }
        Err(e) => {
            // Machine-readable {kind, message} on the error stream
            eprintln!("{}", serde_json::to_string(&e.report())?);
            Err(e.into())
        }
    }
}

/// Show an apply run report (latest by default)
pub fn cmd_report(run_id: Option<&str>, db: Option<&Path>) -> anyhow::Result<()> {
    let store_path = active::resolve_store(db)?;
    let dir = report::reports_dir(&store_path);

    let loaded = match run_id {
        Some(id) => Some(report::load(&dir, id)?),
        None => report::last_report(&dir)?,
    };
    match loaded {
        Some(run_report) => println!("{}", serde_json::to_string_pretty(&run_report)?),
        None => println!("No apply runs recorded"),
    }
    Ok(())
}
