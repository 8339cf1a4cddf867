//! Staged apply executor.
//!
//! The only code in the crate that destroys anything. One run walks a
//! fixed state machine: validating, then either capped (terminal, no
//! mutation) or planning, then either a dry-run report (terminal, no
//! mutation) or execution, then reporting. Every run, including capped
//! and dry ones, persists a complete report artifact; the exclusive lock
//! is released on every exit path because it lives in a guard.

pub mod lock;
pub mod report;

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;

use crate::error::{Error, Result, ResultExt};
use crate::model::{ActionKind, ActionStatus, DeleteMode, TrackRecord};
use crate::store;

use lock::Lock;
use report::{ApplyItem, ApplyRunReport};

/// Everything one apply run is allowed to touch outside the store.
#[derive(Debug, Clone)]
pub struct ApplyContext {
    pub locks_dir: PathBuf,
    pub quarantine_root: PathBuf,
    pub reports_dir: PathBuf,
}

/// Caller intent for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Deletions are allowed at all; without it every candidate is skipped
    pub apply_deletions: bool,
    /// Requested permanent (non-quarantine) deletion
    pub permanent: bool,
    /// The distinct confirmation that must accompany `permanent`
    pub confirm_permanent: bool,
    /// Plan and report only; zero filesystem or store mutation
    pub dry_run: bool,
    /// Cap on candidate count; exceeding it aborts the run before mutation
    pub max_delete: Option<u32>,
}

fn plan_items(candidates: &[TrackRecord], status: ActionStatus, error: Option<&str>) -> Vec<ApplyItem> {
    candidates
        .iter()
        .map(|c| ApplyItem {
            track_id: c.id,
            path: c.original_path.clone(),
            action: ActionKind::Delete.as_str().to_string(),
            status: status.as_str().to_string(),
            error: error.map(String::from),
        })
        .collect()
}

/// Pick a collision-free destination inside the quarantine root.
fn quarantine_destination(root: &Path, src: &Path) -> PathBuf {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let mut dst = root.join(&name);
    let mut counter = 1u32;
    while dst.exists() {
        dst = root.join(format!("{counter}-{name}"));
        counter += 1;
    }
    dst
}

/// Relocate a file into quarantine. Falls back to copy-and-remove when a
/// plain rename fails (quarantine on another filesystem).
fn relocate(src: &Path, dst: &Path) -> std::io::Result<()> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(src, dst)?;
            std::fs::remove_file(src)
        }
    }
}

/// Execute the destructive half of one item. The store is only touched
/// after the filesystem operation succeeded.
async fn execute_item(
    pool: &SqlitePool,
    ctx: &ApplyContext,
    candidate: &TrackRecord,
    mode: DeleteMode,
) -> Result<ApplyItem> {
    let src = Path::new(&candidate.original_path);

    let fs_result: std::io::Result<Option<PathBuf>> = match mode {
        DeleteMode::Quarantine => (|| {
            std::fs::create_dir_all(&ctx.quarantine_root)?;
            let dst = quarantine_destination(&ctx.quarantine_root, src);
            relocate(src, &dst)?;
            Ok(Some(dst))
        })(),
        DeleteMode::Permanent => std::fs::remove_file(src).map(|_| None),
    };

    match fs_result {
        Ok(quarantined_to) => {
            match (mode, quarantined_to) {
                (DeleteMode::Quarantine, Some(dst)) => {
                    let dst_str = dst.to_string_lossy().into_owned();
                    store::record_quarantined(pool, candidate.id, &dst_str).await?;
                    store::insert_action(
                        pool,
                        candidate.id,
                        ActionKind::Delete,
                        &candidate.original_path,
                        Some(&dst_str),
                        ActionStatus::Applied,
                        None,
                    )
                    .await?;
                }
                _ => {
                    // Permanent: the row goes away with the file
                    store::remove_track(pool, candidate.id).await?;
                }
            }
            tracing::info!(
                target: "apply",
                track_id = candidate.id,
                path = %candidate.original_path,
                mode = mode.as_str(),
                "delete applied"
            );
            Ok(ApplyItem {
                track_id: candidate.id,
                path: candidate.original_path.clone(),
                action: ActionKind::Delete.as_str().to_string(),
                status: ActionStatus::Applied.as_str().to_string(),
                error: None,
            })
        }
        Err(e) => {
            // Item fails alone; the record stays untouched and the batch
            // continues
            tracing::warn!(
                target: "apply",
                track_id = candidate.id,
                path = %candidate.original_path,
                error = %e,
                "delete failed"
            );
            store::insert_action(
                pool,
                candidate.id,
                ActionKind::Delete,
                &candidate.original_path,
                None,
                ActionStatus::Failed,
                Some(&e.to_string()),
            )
            .await?;
            Ok(ApplyItem {
                track_id: candidate.id,
                path: candidate.original_path.clone(),
                action: ActionKind::Delete.as_str().to_string(),
                status: ActionStatus::Failed.as_str().to_string(),
                error: Some(e.to_string()),
            })
        }
    }
}

fn finish(
    ctx: &ApplyContext,
    run_id: String,
    started_at: String,
    opts: &ApplyOptions,
    total: usize,
    items: Vec<ApplyItem>,
) -> Result<ApplyRunReport> {
    let succeeded = items.iter().filter(|i| i.status == "applied").count();
    let failed = items.iter().filter(|i| i.status == "failed").count();
    let skipped = items.iter().filter(|i| i.status == "skipped").count();

    let run_report = ApplyRunReport {
        run_id,
        started_at,
        finished_at: store::now_utc(),
        dry_run: opts.dry_run,
        permanent_authorized: opts.permanent && opts.confirm_permanent,
        max_delete: opts.max_delete,
        total_candidates: total,
        delete_success_count: succeeded,
        delete_failed_count: failed,
        delete_skipped_count: skipped,
        items,
    };
    report::persist(&ctx.reports_dir, &run_report)?;
    Ok(run_report)
}

/// Run the apply executor once.
///
/// A partially-failed batch is still a completed run with a report; only
/// lock contention and failed preconditions surface as `Err`.
pub async fn run_apply(
    pool: &SqlitePool,
    ctx: &ApplyContext,
    opts: ApplyOptions,
) -> Result<ApplyRunReport> {
    // Held until this function returns, by any path
    let _lock = Lock::try_acquire(&ctx.locks_dir, "apply")?;

    // Checked before the dry-run branch: requesting permanent deletion
    // without its confirmation is invalid input, simulated or not
    if opts.permanent && !opts.confirm_permanent {
        return Err(Error::validation(
            "permanent deletion requires explicit confirmation",
        ));
    }

    let run_id = report::new_run_id();
    let started_at = store::now_utc();
    let candidates = store::delete_candidates(pool)
        .await
        .with_context("selecting delete candidates")?;
    let total = candidates.len();

    tracing::info!(
        target: "apply",
        run_id = %run_id,
        candidates = total,
        dry_run = opts.dry_run,
        permanent = opts.permanent,
        "apply run started"
    );

    // Safety cap: whole-run abort before any mutation
    if let Some(cap) = opts.max_delete {
        if total > cap as usize {
            tracing::warn!(target: "apply", run_id = %run_id, candidates = total, cap, "safety cap exceeded, aborting before mutation");
            let items = plan_items(&candidates, ActionStatus::Skipped, Some("cap exceeded"));
            return finish(ctx, run_id, started_at, &opts, total, items);
        }
    }

    if opts.dry_run {
        let items = plan_items(&candidates, ActionStatus::Pending, None);
        return finish(ctx, run_id, started_at, &opts, total, items);
    }

    if !opts.apply_deletions {
        let items = plan_items(&candidates, ActionStatus::Skipped, Some("deletions not enabled"));
        return finish(ctx, run_id, started_at, &opts, total, items);
    }

    // Escalation happens at execution time only, never during dry runs
    if opts.permanent {
        let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
        store::set_delete_mode_permanent(pool, &ids).await?;
    }

    let mut items = Vec::with_capacity(total);
    for candidate in &candidates {
        let mode = if opts.permanent {
            DeleteMode::Permanent
        } else {
            candidate.delete_mode()
        };
        items.push(execute_item(pool, ctx, candidate, mode).await?);
    }

    finish(ctx, run_id, started_at, &opts, total, items)
}
