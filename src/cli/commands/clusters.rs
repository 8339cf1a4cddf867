//! Duplicate cluster reporting command.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::alias::cluster;
use crate::store;
use crate::store::active;

/// Show duplicate clusters, or summary statistics with `--stats`.
pub fn cmd_clusters(
    rt: &Runtime,
    min_size: usize,
    stats: bool,
    db: Option<&Path>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let store_path = active::resolve_store(db)?;
        let pool = store::open_store(&store_path).await?;
        let tracks = store::get_all_tracks(&pool).await?;
        let clusters = cluster::build_clusters(&tracks, min_size);

        if stats {
            let stats = cluster::cluster_stats(&clusters);
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("{}", serde_json::to_string_pretty(&clusters)?);
        Ok(())
    })
}
