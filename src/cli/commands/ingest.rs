//! Source scanning command.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::config;
use crate::ingest::{self, IngestMode, IngestOptions, MergePolicy};
use crate::store;
use crate::store::active;

/// Scan a source tree into the staging store.
///
/// CLI flags override the configured defaults per invocation.
#[allow(clippy::too_many_arguments)]
pub fn cmd_scan(
    rt: &Runtime,
    src: &Path,
    lib: Option<&Path>,
    mode: Option<IngestMode>,
    policy: Option<MergePolicy>,
    fingerprint: bool,
    db: Option<&Path>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let cfg = config::load();
        let store_path = active::resolve_store(db)?;
        let pool = store::init_store(&store_path).await?;

        let opts = IngestOptions {
            source: src.to_path_buf(),
            library_root: lib.map(Path::to_path_buf),
            mode: mode.unwrap_or(cfg.ingest.mode),
            policy: policy.unwrap_or(cfg.ingest.overwrite),
            fingerprint: fingerprint || cfg.ingest.fingerprint,
        };

        println!("Scanning {} into {}", src.display(), store_path.display());
        let summary = ingest::run_ingest(&pool, &opts).await?;
        println!(
            "Scanned {} files: {} created, {} updated, {} actions staged",
            summary.scanned, summary.created, summary.updated, summary.actions_created
        );
        Ok(())
    })
}
