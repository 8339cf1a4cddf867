//! Store management commands: activate, list, status.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::apply::{lock::LockInfo, report};
use crate::config;
use crate::store;
use crate::store::active;

/// Set the active staging store
pub fn cmd_activate(db: &Path) -> anyhow::Result<()> {
    let resolved = active::set_active(db)?;
    println!("Active store: {}", resolved.display());
    Ok(())
}

/// List all tracks in the staging store
pub fn cmd_list(rt: &Runtime, db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let store_path = active::resolve_store(db)?;
        let pool = store::open_store(&store_path).await?;
        let tracks = store::get_all_tracks(&pool).await?;

        for track in &tracks {
            let artist = track.artist.as_deref().unwrap_or("<no artist>");
            let title = track.title.as_deref().unwrap_or("<no title>");
            let flag = if track.mark_delete { " [delete]" } else { "" };
            println!(
                "{:>6}  {} - {}{}  {}",
                track.id, artist, title, flag, track.original_path
            );
        }
        println!("{} tracks", tracks.len());
        Ok(())
    })
}

/// Show active store, lock state and last run
pub fn cmd_status() -> anyhow::Result<()> {
    match active::get_active()? {
        Some(store_path) => {
            let exists = if store_path.exists() { "" } else { " (missing)" };
            println!("Active store: {}{}", store_path.display(), exists);

            match report::last_report(&report::reports_dir(&store_path))? {
                Some(last) => println!(
                    "Last apply run: {} ({}, {} succeeded / {} failed / {} skipped)",
                    last.run_id,
                    if last.dry_run { "dry run" } else { "real run" },
                    last.delete_success_count,
                    last.delete_failed_count,
                    last.delete_skipped_count
                ),
                None => println!("Last apply run: none"),
            }
        }
        None => println!("Active store: none (run `activate --db <path>`)"),
    }

    let lock_state = config::locks_dir()
        .map(|dir| dir.join("apply.lock"))
        .filter(|marker| marker.exists())
        .and_then(|marker| std::fs::read_to_string(marker).ok())
        .and_then(|contents| serde_json::from_str::<LockInfo>(&contents).ok());
    match lock_state {
        Some(info) => println!(
            "Apply lock: held by pid {} since {}",
            info.pid, info.created_at
        ),
        None => println!("Apply lock: free"),
    }

    Ok(())
}
