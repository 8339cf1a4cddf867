//! Recommended destination paths inside the library.
//!
//! The layout is `{AlbumArtist|Artist}/{Album}/{NN - }{Title}.{ext}`.
//! Every component is sanitized for cross-platform filesystems: characters
//! illegal on common filesystems become underscores, trailing dots and
//! spaces are trimmed (a Windows nuisance), and components are capped at a
//! conservative length.

use std::path::{Path, PathBuf};

use crate::ingest::tags::RawTags;

/// Maximum length of a single path component after sanitization.
const MAX_COMPONENT_LEN: usize = 120;

/// Sanitize a metadata string for use as a file or directory name.
///
/// Falls back to "Unknown" when the input is absent or sanitizes away to
/// nothing, so callers can always build a path.
pub fn sanitize_component(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "Unknown".to_string();
    };

    let cleaned: String = value
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == ' ' || c == '.');
    let capped: String = trimmed.chars().take(MAX_COMPONENT_LEN).collect();
    // Truncation can re-expose a trailing dot or space
    let capped = capped.trim_end_matches(|c| c == ' ' || c == '.');
    if capped.is_empty() {
        return "Unknown".to_string();
    }
    capped.to_string()
}

/// Suggest a canonical destination for a file given its metadata.
///
/// `album_artist` wins over `artist` for the directory (keeps multi-artist
/// albums together); the file stem stands in for a missing title. Only
/// called in full-scan mode.
pub fn recommended_path(library_root: &Path, tags: &RawTags, source: &Path) -> PathBuf {
    let artist = sanitize_component(
        tags.album_artist
            .as_deref()
            .or(tags.artist.as_deref())
            .or(Some("Unknown Artist")),
    );
    let album = sanitize_component(tags.album.as_deref().or(Some("Unknown Album")));

    let stem = source.file_stem().and_then(|s| s.to_str());
    let title = sanitize_component(tags.title.as_deref().or(stem));

    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let file_name = match tags.track {
        Some(n) if !ext.is_empty() => format!("{n:02} - {title}.{ext}"),
        Some(n) => format!("{n:02} - {title}"),
        None if !ext.is_empty() => format!("{title}.{ext}"),
        None => title,
    };

    library_root.join(artist).join(album).join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(artist: Option<&str>, album_artist: Option<&str>, album: Option<&str>, title: Option<&str>, track: Option<i64>) -> RawTags {
        RawTags {
            artist: artist.map(String::from),
            album_artist: album_artist.map(String::from),
            album: album.map(String::from),
            title: title.map(String::from),
            track,
            ..RawTags::default()
        }
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component(Some("AC/DC")), "AC_DC");
        assert_eq!(sanitize_component(Some("Track: Title")), "Track_ Title");
        assert_eq!(sanitize_component(Some("Valid Name")), "Valid Name");
        assert_eq!(sanitize_component(Some("a<b>c|d")), "a_b_c_d");
        assert_eq!(sanitize_component(None), "Unknown");
    }

    #[test]
    fn test_sanitize_trims_trailing_dots_and_spaces() {
        assert_eq!(sanitize_component(Some("Vol. 2. ")), "Vol. 2");
        assert_eq!(sanitize_component(Some("...")), "Unknown");
        assert_eq!(sanitize_component(Some("  name  ")), "name");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_component(Some(&long)).chars().count(), 120);
    }

    #[test]
    fn test_recommended_path_with_track_number() {
        let t = tags(Some("Queen"), None, Some("A Night at the Opera"), Some("Bohemian Rhapsody"), Some(11));
        let path = recommended_path(Path::new("/library"), &t, Path::new("/incoming/file.flac"));
        assert_eq!(
            path,
            PathBuf::from("/library/Queen/A Night at the Opera/11 - Bohemian Rhapsody.flac")
        );
    }

    #[test]
    fn test_recommended_path_album_artist_wins() {
        let t = tags(Some("Guest Act"), Some("Various Artists"), Some("Mixtape"), Some("Song"), None);
        let path = recommended_path(Path::new("/lib"), &t, Path::new("/in/song.mp3"));
        assert_eq!(path, PathBuf::from("/lib/Various Artists/Mixtape/Song.mp3"));
    }

    #[test]
    fn test_recommended_path_falls_back_to_stem_and_unknowns() {
        let t = RawTags::default();
        let path = recommended_path(Path::new("/lib"), &t, Path::new("/in/mystery_track.OGG"));
        assert_eq!(
            path,
            PathBuf::from("/lib/Unknown Artist/Unknown Album/mystery_track.ogg")
        );
    }

    #[test]
    fn test_recommended_path_sanitizes_every_component() {
        let t = tags(Some("AC/DC"), None, Some("Back: In Black"), Some("What?"), Some(1));
        let path = recommended_path(Path::new("/lib"), &t, Path::new("/in/x.mp3"));
        assert_eq!(path, PathBuf::from("/lib/AC_DC/Back_ In Black/01 - What_.mp3"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_component() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9 ./:*?\"<>|_-]{1,80}").unwrap()
    }

    proptest! {
        /// Sanitized components never contain separators or Windows-invalid chars
        #[test]
        fn sanitize_removes_invalid_chars(input in arbitrary_component()) {
            let out = sanitize_component(Some(&input));
            for c in ['/', '\\', ':', '*', '?', '"', '<', '>', '|'] {
                prop_assert!(!out.contains(c), "found {} in {}", c, out);
            }
        }

        /// Sanitized components never end in a dot or space
        #[test]
        fn sanitize_trims_trailing_noise(input in arbitrary_component()) {
            let out = sanitize_component(Some(&input));
            prop_assert!(!out.ends_with(' '));
            prop_assert!(!out.ends_with('.'));
            prop_assert!(!out.is_empty());
        }

        /// Recommended paths always stay under the library root
        #[test]
        fn recommended_stays_under_root(
            artist in arbitrary_component(),
            album in arbitrary_component(),
            title in arbitrary_component(),
            track in proptest::option::of(1i64..100),
        ) {
            let t = RawTags {
                artist: Some(artist),
                album: Some(album),
                title: Some(title),
                track,
                ..RawTags::default()
            };
            let root = PathBuf::from("/music/library");
            let path = recommended_path(&root, &t, Path::new("/in/test.mp3"));
            prop_assert!(path.starts_with(&root), "{path:?} escapes {root:?}");
        }
    }
}
