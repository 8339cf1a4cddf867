//! SQLite staging store.
//!
//! Uses SQLx with SQLite for lightweight, embedded storage. One `files`
//! row per discovered path (keyed by `original_path`), one `actions` row
//! per staged mutation. The merge of a fresh observation into an existing
//! row is a pure function ([`merge_track`]) so its policy matrix can be
//! tested without a database.

pub mod active;

use std::path::Path;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::{Error, Result};
use crate::ingest::normalize::normalize_text;
use crate::ingest::MergePolicy;
use crate::model::{ActionKind, ActionStatus, ObservedTrack, StagedAction, TrackRecord};

/// Build a SQLite connection URL from a store path.
pub fn db_url(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

/// Initialize the staging store, creating it if needed, and run migrations.
pub async fn init_store(path: &Path) -> Result<SqlitePool> {
    let url = db_url(path);
    if !sqlx::Sqlite::database_exists(&url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(&url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| Error::internal(format!("migration failed: {e}")))?;

    Ok(pool)
}

/// Open an existing staging store. Missing file is a precondition failure,
/// not a silently created empty store.
pub async fn open_store(path: &Path) -> Result<SqlitePool> {
    if !path.exists() {
        return Err(Error::StoreNotFound(path.to_path_buf()));
    }
    init_store(path).await
}

/// Current time in the format every timestamp column uses.
pub fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ============================================================================
// Merge
// ============================================================================

fn merge_opt<T: Clone>(existing: &Option<T>, observed: &Option<T>, policy: MergePolicy) -> Option<T> {
    match policy {
        MergePolicy::Overwrite => observed.clone().or_else(|| existing.clone()),
        MergePolicy::FillMissingOnly => existing.clone().or_else(|| observed.clone()),
    }
}

/// Merge one scan observation into an existing record, pure and in-memory.
///
/// Field-by-field under the given policy, with one documented exception:
/// `sha256` and `size_bytes` always refresh when the observation carries
/// them, because content identity must track the file as it is now.
/// Normalized fields are recomputed from the merged raw fields, never
/// merged themselves. `last_update` always advances; `first_seen` is
/// untouched.
pub fn merge_track(
    existing: &TrackRecord,
    observed: &ObservedTrack,
    policy: MergePolicy,
    now: &str,
) -> TrackRecord {
    let mut merged = existing.clone();

    // Content identity refreshes regardless of policy
    if observed.sha256.is_some() {
        merged.sha256 = observed.sha256.clone();
    }
    if observed.size_bytes.is_some() {
        merged.size_bytes = observed.size_bytes;
    }

    merged.artist = merge_opt(&existing.artist, &observed.artist, policy);
    merged.album_artist = merge_opt(&existing.album_artist, &observed.album_artist, policy);
    merged.album = merge_opt(&existing.album, &observed.album, policy);
    merged.title = merge_opt(&existing.title, &observed.title, policy);
    merged.track = merge_opt(&existing.track, &observed.track, policy);
    merged.track_total = merge_opt(&existing.track_total, &observed.track_total, policy);
    merged.disc = merge_opt(&existing.disc, &observed.disc, policy);
    merged.disc_total = merge_opt(&existing.disc_total, &observed.disc_total, policy);
    merged.composer = merge_opt(&existing.composer, &observed.composer, policy);
    merged.year = merge_opt(&existing.year, &observed.year, policy);
    merged.bpm = merge_opt(&existing.bpm, &observed.bpm, policy);
    merged.comment = merge_opt(&existing.comment, &observed.comment, policy);
    merged.lyrics = merge_opt(&existing.lyrics, &observed.lyrics, policy);
    merged.publisher = merge_opt(&existing.publisher, &observed.publisher, policy);
    merged.genre = merge_opt(&existing.genre, &observed.genre, policy);
    merged.duration = merge_opt(&existing.duration, &observed.duration, policy);
    merged.bitrate = merge_opt(&existing.bitrate, &observed.bitrate, policy);
    merged.fingerprint = merge_opt(&existing.fingerprint, &observed.fingerprint, policy);
    merged.recommended_path =
        merge_opt(&existing.recommended_path, &observed.recommended_path, policy);

    if let Some(flag) = observed.is_compilation {
        if policy == MergePolicy::Overwrite {
            merged.is_compilation = flag;
        }
    }

    set_norms(&mut merged);
    merged.last_update = Some(now.to_string());
    merged
}

fn norm_of(raw: &Option<String>) -> Option<String> {
    let normalized = normalize_text(raw.as_deref());
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Recompute the derived `*_norm` fields from the raw fields.
fn set_norms(record: &mut TrackRecord) {
    record.artist_norm = norm_of(&record.artist);
    record.album_artist_norm = norm_of(&record.album_artist);
    record.album_norm = norm_of(&record.album);
    record.title_norm = norm_of(&record.title);
}

// ============================================================================
// Track queries
// ============================================================================

const TRACK_COLUMNS: &str = "id, original_path, sha256, size_bytes, artist, album_artist, album, \
     title, track, track_total, disc, disc_total, composer, year, bpm, comment, lyrics, \
     publisher, genre, duration, bitrate, is_compilation, fingerprint, artist_norm, \
     album_artist_norm, album_norm, title_norm, recommended_path, lifecycle_state, mark_delete, \
     quarantined_path, quarantined_at, delete_mode, first_seen, last_update";

/// Get all tracks, ordered by id for stable output.
pub async fn get_all_tracks(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    let sql = format!("SELECT {TRACK_COLUMNS} FROM files ORDER BY id");
    Ok(sqlx::query_as(&sql).fetch_all(pool).await?)
}

pub async fn get_track(pool: &SqlitePool, id: i64) -> Result<Option<TrackRecord>> {
    let sql = format!("SELECT {TRACK_COLUMNS} FROM files WHERE id = ?");
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get_track_by_path(pool: &SqlitePool, path: &str) -> Result<Option<TrackRecord>> {
    let sql = format!("SELECT {TRACK_COLUMNS} FROM files WHERE original_path = ?");
    Ok(sqlx::query_as(&sql).bind(path).fetch_optional(pool).await?)
}

/// Delete candidates in deterministic order: `mark_delete = 1`, lowest id
/// first. The apply executor and the safety cap both read exactly this set.
pub async fn delete_candidates(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    let sql = format!("SELECT {TRACK_COLUMNS} FROM files WHERE mark_delete = 1 ORDER BY id");
    Ok(sqlx::query_as(&sql).fetch_all(pool).await?)
}

// ============================================================================
// Ingestion writes
// ============================================================================

/// Result of observing one path: the row id and whether it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub created: bool,
}

/// Insert or merge one scan observation keyed by `original_path`.
///
/// New paths get a fresh row with `first_seen = last_update = now`.
/// Known paths are merged under `policy` via [`merge_track`] and written
/// back. Re-running with identical inputs converges: the second pass
/// changes nothing but `last_update`.
pub async fn upsert_observation(
    pool: &SqlitePool,
    original_path: &str,
    observed: &ObservedTrack,
    policy: MergePolicy,
) -> Result<UpsertOutcome> {
    let now = now_utc();

    if let Some(existing) = get_track_by_path(pool, original_path).await? {
        let merged = merge_track(&existing, observed, policy, &now);
        update_track(pool, &merged).await?;
        return Ok(UpsertOutcome {
            id: existing.id,
            created: false,
        });
    }

    let artist_norm = norm_of(&observed.artist);
    let album_artist_norm = norm_of(&observed.album_artist);
    let album_norm = norm_of(&observed.album);
    let title_norm = norm_of(&observed.title);

    let result = sqlx::query(
        "INSERT INTO files (original_path, sha256, size_bytes, artist, album_artist, album, \
         title, track, track_total, disc, disc_total, composer, year, bpm, comment, lyrics, \
         publisher, genre, duration, bitrate, is_compilation, fingerprint, artist_norm, \
         album_artist_norm, album_norm, title_norm, recommended_path, first_seen, last_update) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(original_path)
    .bind(&observed.sha256)
    .bind(observed.size_bytes)
    .bind(&observed.artist)
    .bind(&observed.album_artist)
    .bind(&observed.album)
    .bind(&observed.title)
    .bind(observed.track)
    .bind(observed.track_total)
    .bind(observed.disc)
    .bind(observed.disc_total)
    .bind(&observed.composer)
    .bind(&observed.year)
    .bind(observed.bpm)
    .bind(&observed.comment)
    .bind(&observed.lyrics)
    .bind(&observed.publisher)
    .bind(&observed.genre)
    .bind(observed.duration)
    .bind(observed.bitrate)
    .bind(observed.is_compilation.unwrap_or(false))
    .bind(&observed.fingerprint)
    .bind(&artist_norm)
    .bind(&album_artist_norm)
    .bind(&album_norm)
    .bind(&title_norm)
    .bind(&observed.recommended_path)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(UpsertOutcome {
        id: result.last_insert_rowid(),
        created: true,
    })
}

async fn update_track(pool: &SqlitePool, record: &TrackRecord) -> Result<()> {
    sqlx::query(
        "UPDATE files SET sha256 = ?, size_bytes = ?, artist = ?, album_artist = ?, album = ?, \
         title = ?, track = ?, track_total = ?, disc = ?, disc_total = ?, composer = ?, \
         year = ?, bpm = ?, comment = ?, lyrics = ?, publisher = ?, genre = ?, duration = ?, \
         bitrate = ?, is_compilation = ?, fingerprint = ?, artist_norm = ?, \
         album_artist_norm = ?, album_norm = ?, title_norm = ?, recommended_path = ?, \
         last_update = ? WHERE id = ?",
    )
    .bind(&record.sha256)
    .bind(record.size_bytes)
    .bind(&record.artist)
    .bind(&record.album_artist)
    .bind(&record.album)
    .bind(&record.title)
    .bind(record.track)
    .bind(record.track_total)
    .bind(record.disc)
    .bind(record.disc_total)
    .bind(&record.composer)
    .bind(&record.year)
    .bind(record.bpm)
    .bind(&record.comment)
    .bind(&record.lyrics)
    .bind(&record.publisher)
    .bind(&record.genre)
    .bind(record.duration)
    .bind(record.bitrate)
    .bind(record.is_compilation)
    .bind(&record.fingerprint)
    .bind(&record.artist_norm)
    .bind(&record.album_artist_norm)
    .bind(&record.album_norm)
    .bind(&record.title_norm)
    .bind(&record.recommended_path)
    .bind(&record.last_update)
    .bind(record.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Recompute normalized fields for every row from its stored raw fields.
/// This is the whole of normalize-only mode; raw fields stay untouched.
pub async fn recompute_all_norms(pool: &SqlitePool) -> Result<u64> {
    let tracks = get_all_tracks(pool).await?;
    let mut updated = 0u64;
    for mut track in tracks {
        let before = (
            track.artist_norm.clone(),
            track.album_artist_norm.clone(),
            track.album_norm.clone(),
            track.title_norm.clone(),
        );
        set_norms(&mut track);
        let after = (
            track.artist_norm.clone(),
            track.album_artist_norm.clone(),
            track.album_norm.clone(),
            track.title_norm.clone(),
        );
        if before != after {
            sqlx::query(
                "UPDATE files SET artist_norm = ?, album_artist_norm = ?, album_norm = ?, \
                 title_norm = ?, last_update = ? WHERE id = ?",
            )
            .bind(&track.artist_norm)
            .bind(&track.album_artist_norm)
            .bind(&track.album_norm)
            .bind(&track.title_norm)
            .bind(now_utc())
            .bind(track.id)
            .execute(pool)
            .await?;
            updated += 1;
        }
    }
    Ok(updated)
}

// ============================================================================
// Delete staging
// ============================================================================

/// Flag a track as a delete candidate. Returns false if the id is unknown.
pub async fn mark_delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE files SET mark_delete = 1, last_update = ? WHERE id = ?")
        .bind(now_utc())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Clear the delete-candidate flag. Returns false if the id is unknown.
pub async fn unmark_delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE files SET mark_delete = 0, last_update = ? WHERE id = ?")
        .bind(now_utc())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Escalate the given candidates to permanent deletion. Called by the
/// apply executor just before execution, never during a dry run.
pub async fn set_delete_mode_permanent(pool: &SqlitePool, ids: &[i64]) -> Result<()> {
    for id in ids {
        sqlx::query("UPDATE files SET delete_mode = 'permanent', last_update = ? WHERE id = ?")
            .bind(now_utc())
            .bind(id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

// ============================================================================
// Apply-side mutations
// ============================================================================

/// Record a successful quarantine relocation. Clears the candidate flag so
/// a repeated apply run does not touch the file again.
pub async fn record_quarantined(pool: &SqlitePool, id: i64, quarantined_path: &str) -> Result<()> {
    let now = now_utc();
    sqlx::query(
        "UPDATE files SET quarantined_path = ?, quarantined_at = ?, \
         lifecycle_state = 'quarantined', mark_delete = 0, last_update = ? WHERE id = ?",
    )
    .bind(quarantined_path)
    .bind(&now)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a row after its file was permanently deleted.
pub async fn remove_track(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM actions WHERE file_id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Staged actions
// ============================================================================

/// Record a staged action with its resolved (or pending) status.
pub async fn insert_action(
    pool: &SqlitePool,
    file_id: i64,
    kind: ActionKind,
    src_path: &str,
    dst_path: Option<&str>,
    status: ActionStatus,
    error: Option<&str>,
) -> Result<i64> {
    let now = now_utc();
    let applied_at = match status {
        ActionStatus::Applied | ActionStatus::Failed => Some(now.clone()),
        ActionStatus::Pending | ActionStatus::Skipped => None,
    };
    let result = sqlx::query(
        "INSERT INTO actions (file_id, action, src_path, dst_path, status, error, created_at, \
         applied_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(file_id)
    .bind(kind.as_str())
    .bind(src_path)
    .bind(dst_path)
    .bind(status.as_str())
    .bind(error)
    .bind(&now)
    .bind(applied_at)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_actions_for_file(pool: &SqlitePool, file_id: i64) -> Result<Vec<StagedAction>> {
    Ok(sqlx::query_as(
        "SELECT id, file_id, action, src_path, dst_path, status, error, created_at, applied_at \
         FROM actions WHERE file_id = ? ORDER BY id",
    )
    .bind(file_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_all_actions(pool: &SqlitePool) -> Result<Vec<StagedAction>> {
    Ok(sqlx::query_as(
        "SELECT id, file_id, action, src_path, dst_path, status, error, created_at, applied_at \
         FROM actions ORDER BY id",
    )
    .fetch_all(pool)
    .await?)
}
