//! Audio tag extraction via lofty.
//!
//! Read-only and best-effort: a file lofty cannot parse yields an
//! all-empty [`RawTags`] instead of an error, so one corrupt file never
//! aborts a scan. Raw values are stored exactly as found; absence stays
//! absence rather than being papered over with placeholder strings.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;

/// Raw tag fields plus technical properties, all optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
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
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_tag_fields(tag: &Tag) -> RawTags {
    RawTags {
        artist: non_empty(tag.artist().as_deref()),
        album_artist: non_empty(tag.get_string(&ItemKey::AlbumArtist)),
        album: non_empty(tag.album().as_deref()),
        title: non_empty(tag.title().as_deref()),
        track: tag.track().map(i64::from),
        track_total: tag.track_total().map(i64::from),
        disc: tag.disk().map(i64::from),
        disc_total: tag.disk_total().map(i64::from),
        composer: non_empty(tag.get_string(&ItemKey::Composer)),
        year: tag.year().map(|y| y.to_string()),
        // Integer BPM preferred; fall back to the fractional key
        bpm: tag
            .get_string(&ItemKey::IntegerBpm)
            .or_else(|| tag.get_string(&ItemKey::Bpm))
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(|b| b.round() as i64),
        comment: non_empty(tag.comment().as_deref()),
        lyrics: non_empty(tag.get_string(&ItemKey::Lyrics)),
        publisher: non_empty(tag.get_string(&ItemKey::Publisher)),
        genre: non_empty(tag.genre().as_deref()),
        duration: None,
        bitrate: None,
        is_compilation: tag
            .get_string(&ItemKey::FlagCompilation)
            .map(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    }
}

/// Extract tags and technical info from an audio file, best-effort.
///
/// Never returns an error: files lofty cannot probe or parse come back
/// as an all-`None` record so the caller can still hash and stage them.
pub fn extract_tags(path: &Path) -> RawTags {
    let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(target: "ingest::tags", path = %path.display(), error = %e, "tag extraction failed, continuing with empty tags");
            return RawTags::default();
        }
    };

    // Primary tag, or fall back to the first available one
    let mut raw = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .map(read_tag_fields)
        .unwrap_or_default();

    let properties = tagged_file.properties();
    let secs = properties.duration().as_secs_f64();
    if secs > 0.0 {
        raw.duration = Some(secs);
    }
    raw.bitrate = properties.audio_bitrate().map(i64::from);

    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_non_audio_file_yields_empty_tags() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "This is just some text, not music.").unwrap();

        let tags = extract_tags(file.path());
        assert_eq!(tags, RawTags::default());
    }

    #[test]
    fn test_missing_file_yields_empty_tags() {
        let tags = extract_tags(Path::new("nonexistent_file.mp3"));
        assert_eq!(tags, RawTags::default());
    }

    #[test]
    fn test_non_empty_filters_whitespace() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some(" Queen ")), Some("Queen".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
