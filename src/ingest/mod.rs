//! Signal & Merge Engine: the ingestion pipeline.
//!
//! One pass over a source tree turns each audio file into an
//! [`ObservedTrack`](crate::model::ObservedTrack) (tags, content hash,
//! optional fingerprint, recommended destination) and merges it into the
//! staging store keyed by original path. The pass is idempotent: scanning
//! the same unchanged tree twice converges to the same store state, and
//! never duplicates staged move actions.

pub mod fingerprint;
pub mod hash;
pub mod normalize;
pub mod paths;
pub mod tags;

use std::path::{Path, PathBuf};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{Error, Result, ResultExt};
use crate::model::{ActionKind, ActionStatus, ObservedTrack};
use crate::scanner;
use crate::store;

/// How much of the pipeline one ingestion pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IngestMode {
    /// Scan, hash, tag, stage moves: the whole pipeline
    Full,
    /// Create/migrate the store schema only, no scanning
    SchemaOnly,
    /// Scan and refresh records, but stage no file actions
    DbUpdateOnly,
    /// Recompute normalized fields from stored raw fields, no scanning
    NormalizeOnly,
}

/// How an observation merges into an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Observed values replace stored values
    Overwrite,
    /// Stored values win; observations only fill gaps
    FillMissingOnly,
}

/// One ingestion run, fully specified.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Source tree to scan (ignored by schema-only and normalize-only)
    pub source: PathBuf,
    /// Library root for recommended paths; no root means no staged moves
    pub library_root: Option<PathBuf>,
    pub mode: IngestMode,
    pub policy: MergePolicy,
    /// Attempt acoustic fingerprints (full mode only, needs fpcalc)
    pub fingerprint: bool,
}

/// Structured result of one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub scanned: u64,
    pub created: u64,
    pub updated: u64,
    pub actions_created: u64,
}

/// Build the observation for one file, best-effort throughout.
///
/// Tag extraction never fails; a hash failure logs and leaves the field
/// absent rather than aborting the scan. Only full mode touches content:
/// `db-update-only` re-extracts tags and leaves hash, size, fingerprint
/// and recommended path alone. Everything here is blocking work and runs
/// on a blocking task.
fn observe_file(path: &Path, opts: &IngestOptions) -> ObservedTrack {
    let raw = tags::extract_tags(path);

    let sha256 = if opts.mode == IngestMode::Full {
        match hash::sha256_file(path) {
            Ok(digest) => Some(digest),
            Err(e) => {
                tracing::warn!(target: "ingest", path = %path.display(), error = %e, "hashing failed, record will lack a content hash");
                None
            }
        }
    } else {
        None
    };
    let size_bytes = if opts.mode == IngestMode::Full {
        std::fs::metadata(path).ok().map(|m| m.len() as i64)
    } else {
        None
    };

    let fingerprint = if opts.mode == IngestMode::Full && opts.fingerprint {
        fingerprint::compute_fingerprint(path)
    } else {
        None
    };

    let recommended_path = match (&opts.library_root, opts.mode) {
        (Some(root), IngestMode::Full) => Some(
            paths::recommended_path(root, &raw, path)
                .to_string_lossy()
                .into_owned(),
        ),
        _ => None,
    };

    ObservedTrack {
        sha256,
        size_bytes,
        artist: raw.artist,
        album_artist: raw.album_artist,
        album: raw.album,
        title: raw.title,
        track: raw.track,
        track_total: raw.track_total,
        disc: raw.disc,
        disc_total: raw.disc_total,
        composer: raw.composer,
        year: raw.year,
        bpm: raw.bpm,
        comment: raw.comment,
        lyrics: raw.lyrics,
        publisher: raw.publisher,
        genre: raw.genre,
        duration: raw.duration,
        bitrate: raw.bitrate,
        is_compilation: Some(raw.is_compilation),
        fingerprint,
        recommended_path,
    }
}

/// Run one ingestion pass against an already-opened store.
///
/// Schema-only mode is a no-op here because opening the store already ran
/// the migrations. Normalize-only never touches the filesystem. The other
/// two modes stream the scanner and upsert per file; a staged `move`
/// action is created only for rows this pass created, and only in full
/// mode with a library root.
pub async fn run_ingest(pool: &SqlitePool, opts: &IngestOptions) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    match opts.mode {
        IngestMode::SchemaOnly => {
            tracing::info!(target: "ingest", "schema-only: store migrated, nothing to scan");
            return Ok(summary);
        }
        IngestMode::NormalizeOnly => {
            summary.updated = store::recompute_all_norms(pool).await?;
            tracing::info!(target: "ingest", updated = summary.updated, "normalize-only pass complete");
            return Ok(summary);
        }
        IngestMode::Full | IngestMode::DbUpdateOnly => {}
    }

    if !opts.source.is_dir() {
        return Err(Error::validation(format!(
            "source is not a directory: {}",
            opts.source.display()
        )));
    }

    let mut stream = Box::pin(scanner::scan(opts.source.clone()));
    while let Some(path) = stream.next().await {
        summary.scanned += 1;

        let blocking_opts = opts.clone();
        let blocking_path = path.clone();
        let observed =
            tokio::task::spawn_blocking(move || observe_file(&blocking_path, &blocking_opts))
                .await
                .map_err(|e| Error::internal(format!("observation task failed: {e}")))?;

        let original_path = path.to_string_lossy().into_owned();
        let outcome = store::upsert_observation(pool, &original_path, &observed, opts.policy)
            .await
            .with_context(format!("upserting {original_path}"))?;

        if outcome.created {
            summary.created += 1;
            if opts.mode == IngestMode::Full {
                if let Some(dst) = &observed.recommended_path {
                    store::insert_action(
                        pool,
                        outcome.id,
                        ActionKind::Move,
                        &original_path,
                        Some(dst),
                        ActionStatus::Pending,
                        None,
                    )
                    .await?;
                    summary.actions_created += 1;
                }
            }
        } else {
            summary.updated += 1;
        }
    }

    tracing::info!(
        target: "ingest",
        scanned = summary.scanned,
        created = summary.created,
        updated = summary.updated,
        actions = summary.actions_created,
        "ingestion pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options(source: &Path, lib: Option<&Path>, mode: IngestMode) -> IngestOptions {
        IngestOptions {
            source: source.to_path_buf(),
            library_root: lib.map(Path::to_path_buf),
            mode,
            policy: MergePolicy::Overwrite,
            fingerprint: false,
        }
    }

    async fn pool_in(dir: &tempfile::TempDir) -> SqlitePool {
        store::init_store(&dir.path().join("store.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_ingest_then_reingest_is_idempotent() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let lib = dir.path().join("lib");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.mp3"), b"not really audio but hashable").unwrap();
        fs::write(src.join("b.flac"), b"other bytes").unwrap();
        fs::write(src.join("notes.txt"), b"ignored").unwrap();

        let pool = pool_in(&dir).await;
        let opts = options(&src, Some(&lib), IngestMode::Full);

        let first = run_ingest(&pool, &opts).await.unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(first.created, 2);
        assert_eq!(first.updated, 0);
        assert_eq!(first.actions_created, 2);

        let second = run_ingest(&pool, &opts).await.unwrap();
        assert_eq!(second.scanned, 2);
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);
        // Re-scans never duplicate staged moves
        assert_eq!(second.actions_created, 0);

        let tracks = store::get_all_tracks(&pool).await.unwrap();
        assert_eq!(tracks.len(), 2);
        for track in &tracks {
            assert!(track.sha256.is_some());
            assert!(track.size_bytes.is_some());
            assert!(track.recommended_path.is_some());
        }
        assert_eq!(store::get_all_actions(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_db_update_only_stages_no_actions_and_skips_content() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.mp3"), b"bytes").unwrap();

        let pool = pool_in(&dir).await;
        let summary = run_ingest(&pool, &options(&src, None, IngestMode::DbUpdateOnly))
            .await
            .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.actions_created, 0);
        assert!(store::get_all_actions(&pool).await.unwrap().is_empty());

        // Metadata pass only: no hash, no size, no recommended path
        let track = &store::get_all_tracks(&pool).await.unwrap()[0];
        assert!(track.sha256.is_none());
        assert!(track.size_bytes.is_none());
        assert!(track.recommended_path.is_none());
    }

    #[tokio::test]
    async fn test_db_update_only_preserves_existing_hash() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let file = src.join("a.mp3");
        fs::write(&file, b"original bytes").unwrap();

        let pool = pool_in(&dir).await;
        run_ingest(&pool, &options(&src, None, IngestMode::Full))
            .await
            .unwrap();
        let before = store::get_all_tracks(&pool).await.unwrap()[0].clone();
        assert!(before.sha256.is_some());

        // Content changes on disk, but a db-update-only pass must not
        // recompute (or clear) the stored hash and size
        fs::write(&file, b"different bytes entirely").unwrap();
        run_ingest(&pool, &options(&src, None, IngestMode::DbUpdateOnly))
            .await
            .unwrap();

        let after = &store::get_all_tracks(&pool).await.unwrap()[0];
        assert_eq!(after.sha256, before.sha256);
        assert_eq!(after.size_bytes, before.size_bytes);
    }

    #[tokio::test]
    async fn test_schema_only_scans_nothing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.mp3"), b"bytes").unwrap();

        let pool = pool_in(&dir).await;
        let summary = run_ingest(&pool, &options(&src, None, IngestMode::SchemaOnly))
            .await
            .unwrap();

        assert_eq!(summary, IngestSummary::default());
        assert!(store::get_all_tracks(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_normalize_only_touches_no_files() {
        let dir = tempdir().unwrap();
        let pool = pool_in(&dir).await;

        // Seed a record directly, then normalize against a source dir that
        // does not even exist; normalize-only must not care.
        let observed = ObservedTrack {
            artist: Some("Sigur Rós".into()),
            ..ObservedTrack::default()
        };
        store::upsert_observation(&pool, "/gone/a.mp3", &observed, MergePolicy::Overwrite)
            .await
            .unwrap();

        let missing = dir.path().join("no-such-dir");
        let summary = run_ingest(&pool, &options(&missing, None, IngestMode::NormalizeOnly))
            .await
            .unwrap();
        // Upsert already computed norms, so the pass converges to zero
        assert_eq!(summary.updated, 0);

        let track = &store::get_all_tracks(&pool).await.unwrap()[0];
        assert_eq!(track.artist_norm.as_deref(), Some("sigur ros"));
    }

    #[tokio::test]
    async fn test_missing_source_is_validation_error() {
        let dir = tempdir().unwrap();
        let pool = pool_in(&dir).await;
        let missing = dir.path().join("nope");
        let err = run_ingest(&pool, &options(&missing, None, IngestMode::Full))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
