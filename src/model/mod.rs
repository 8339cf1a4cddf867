//! Domain types for the staging store.
//!
//! A [`TrackRecord`] is one row per discovered file; a [`StagedAction`] is
//! one intended mutation recorded against a file. Both map 1:1 onto the
//! SQLite schema in `migrations/`. [`ObservedTrack`] is the nullable
//! "what this scan saw" shape that gets merged into an existing record
//! under a [`MergePolicy`](crate::ingest::MergePolicy).

use serde::Serialize;

/// One row per discovered file. `original_path` is the unique key.
///
/// The `*_norm` fields are always a pure function of the raw fields that
/// produced them; they are recomputed together and never hand-edited.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackRecord {
    /// Database ID
    pub id: i64,
    /// Absolute path of the file as first discovered (unique key)
    pub original_path: String,
    /// Full-content SHA-256, lowercase hex; null until computed
    pub sha256: Option<String>,
    /// File size in bytes
    pub size_bytes: Option<i64>,

    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track: Option<i64>,
    pub track_total: Option<i64>,
    pub disc: Option<i64>,
    pub disc_total: Option<i64>,
    pub composer: Option<String>,
    pub year: Option<String>,
    pub bpm: Option<i64>,
    pub comment: Option<String>,
    pub lyrics: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Bitrate in kbps
    pub bitrate: Option<i64>,
    pub is_compilation: bool,

    /// Acoustic fingerprint; null when fpcalc was unavailable or failed
    pub fingerprint: Option<String>,

    pub artist_norm: Option<String>,
    pub album_artist_norm: Option<String>,
    pub album_norm: Option<String>,
    pub title_norm: Option<String>,

    /// Suggested destination inside the library (full-scan mode only)
    pub recommended_path: Option<String>,
    /// Free-form lifecycle tag: "new", "analyzed", "quarantined", ...
    pub lifecycle_state: String,
    /// Delete candidate flag, read by the apply executor
    pub mark_delete: bool,
    pub quarantined_path: Option<String>,
    pub quarantined_at: Option<String>,
    /// "quarantine" | "permanent"
    pub delete_mode: String,
    pub first_seen: Option<String>,
    pub last_update: Option<String>,
}

impl TrackRecord {
    /// How many of {artist, album, title} are present. Used when ranking
    /// canonical candidates inside a duplicate cluster.
    pub fn metadata_presence(&self) -> usize {
        [&self.artist, &self.album, &self.title]
            .iter()
            .filter(|f| f.is_some())
            .count()
    }

    pub fn delete_mode(&self) -> DeleteMode {
        DeleteMode::parse(&self.delete_mode)
    }
}

/// The nullable fields one ingestion pass observed for a path.
///
/// Every field is optional: the tag extractor is best-effort, the hash
/// and fingerprint are mode-gated, and the recommended path only exists
/// in full-scan mode.
#[derive(Debug, Clone, Default)]
pub struct ObservedTrack {
    pub sha256: Option<String>,
    pub size_bytes: Option<i64>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track: Option<i64>,
    pub track_total: Option<i64>,
    pub disc: Option<i64>,
    pub disc_total: Option<i64>,
    pub composer: Option<String>,
    pub year: Option<String>,
    pub bpm: Option<i64>,
    pub comment: Option<String>,
    pub lyrics: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<f64>,
    pub bitrate: Option<i64>,
    pub is_compilation: Option<bool>,
    pub fingerprint: Option<String>,
    pub recommended_path: Option<String>,
}

/// Soft-delete relocates into quarantine; permanent erases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Quarantine,
    Permanent,
}

impl DeleteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quarantine => "quarantine",
            Self::Permanent => "permanent",
        }
    }

    /// Unknown values fall back to quarantine, the non-destructive mode.
    pub fn parse(s: &str) -> Self {
        match s {
            "permanent" => Self::Permanent,
            _ => Self::Quarantine,
        }
    }
}

/// Kind of staged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Delete,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Delete => "delete",
        }
    }
}

/// Lifecycle of a staged action. `Pending` until the apply executor
/// resolves it one way or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Applied,
    Failed,
    Skipped,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One staged mutation against a file, separate from execution.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StagedAction {
    pub id: i64,
    pub file_id: i64,
    /// "move" | "delete"
    pub action: String,
    pub src_path: String,
    pub dst_path: Option<String>,
    /// "pending" | "applied" | "failed" | "skipped"
    pub status: String,
    pub error: Option<String>,
    pub created_at: String,
    pub applied_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_mode_roundtrip() {
        assert_eq!(DeleteMode::parse("permanent"), DeleteMode::Permanent);
        assert_eq!(DeleteMode::parse("quarantine"), DeleteMode::Quarantine);
        // Unknown input never escalates to permanent
        assert_eq!(DeleteMode::parse("???"), DeleteMode::Quarantine);
        assert_eq!(DeleteMode::Permanent.as_str(), "permanent");
    }

    #[test]
    fn test_metadata_presence_counts_core_fields() {
        let mut record = TrackRecord {
            id: 1,
            original_path: "/music/a.mp3".into(),
            sha256: None,
            size_bytes: None,
            artist: Some("Artist".into()),
            album_artist: None,
            album: None,
            title: Some("Title".into()),
            track: None,
            track_total: None,
            disc: None,
            disc_total: None,
            composer: None,
            year: None,
            bpm: None,
            comment: None,
            lyrics: None,
            publisher: None,
            genre: None,
            duration: None,
            bitrate: None,
            is_compilation: false,
            fingerprint: None,
            artist_norm: None,
            album_artist_norm: None,
            album_norm: None,
            title_norm: None,
            recommended_path: None,
            lifecycle_state: "new".into(),
            mark_delete: false,
            quarantined_path: None,
            quarantined_at: None,
            delete_mode: "quarantine".into(),
            first_seen: None,
            last_update: None,
        };
        assert_eq!(record.metadata_presence(), 2);
        record.album = Some("Album".into());
        assert_eq!(record.metadata_presence(), 3);
        // album_artist is deliberately not counted
        record.artist = None;
        record.album_artist = Some("AA".into());
        assert_eq!(record.metadata_presence(), 2);
    }
}
