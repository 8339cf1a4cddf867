//! Alias signal graph.
//!
//! Two tracks become related through up to four signal types, each with a
//! fixed strength. Signals aggregate per unordered pair; a pair whose
//! combined evidence crosses the promotion threshold becomes a strong
//! edge, the input to clustering. Nothing here is persisted: the graph is
//! derived fresh from the current track set on every call, so it reflects
//! edits immediately.

pub mod cluster;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::model::TrackRecord;

/// One kind of duplicate evidence between two tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Equal non-null content hash
    Sha256,
    /// Equal non-null acoustic fingerprint
    Fingerprint,
    /// Equal non-empty normalized artist and title
    ArtistTitle,
    /// Equal non-empty normalized album and title
    AlbumTitle,
}

impl SignalType {
    /// Fixed per-signal strength. Undocumented heuristics, preserved
    /// exactly; do not re-derive.
    pub fn strength(self) -> f64 {
        match self {
            Self::Sha256 => 1.0,
            Self::Fingerprint => 0.9,
            Self::ArtistTitle => 0.6,
            Self::AlbumTitle => 0.4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Fingerprint => "fingerprint",
            Self::ArtistTitle => "artist_title",
            Self::AlbumTitle => "album_title",
        }
    }
}

/// Threshold for promoting aggregated evidence to a strong edge.
const STRONG_EDGE_STRENGTH: f64 = 1.5;

/// Aggregated evidence for one unordered track pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEvidence {
    /// Lower id first
    pub a: i64,
    pub b: i64,
    pub signals: BTreeSet<SignalType>,
}

impl PairEvidence {
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn strength_sum(&self) -> f64 {
        self.signals.iter().map(|s| s.strength()).sum()
    }

    /// Promotion rule: two distinct signal types, or combined strength at
    /// the threshold. An exact-hash signal promotes on its own so that
    /// hash-equal tracks always land in the same cluster, whatever their
    /// tags look like.
    pub fn is_strong(&self) -> bool {
        self.signal_count() >= 2
            || self.strength_sum() >= STRONG_EDGE_STRENGTH
            || self.signals.contains(&SignalType::Sha256)
    }
}

fn add_pairs_for_group<K: std::hash::Hash + Eq>(
    pairs: &mut BTreeMap<(i64, i64), BTreeSet<SignalType>>,
    groups: HashMap<K, Vec<i64>>,
    signal: SignalType,
) {
    for (_, mut ids) in groups {
        if ids.len() < 2 {
            continue;
        }
        ids.sort_unstable();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                pairs.entry((ids[i], ids[j])).or_default().insert(signal);
            }
        }
    }
}

/// Aggregate all signal evidence over the given track set.
///
/// Purely relational: each signal groups tracks by its key (hash,
/// fingerprint, or normalized field combination) and every unordered pair
/// inside a group gets that signal once. Self-pairs are impossible by
/// construction.
pub fn build_pair_evidence(tracks: &[TrackRecord]) -> Vec<PairEvidence> {
    let mut pairs: BTreeMap<(i64, i64), BTreeSet<SignalType>> = BTreeMap::new();

    let mut by_hash: HashMap<&str, Vec<i64>> = HashMap::new();
    let mut by_fingerprint: HashMap<&str, Vec<i64>> = HashMap::new();
    let mut by_artist_title: HashMap<(&str, &str), Vec<i64>> = HashMap::new();
    let mut by_album_title: HashMap<(&str, &str), Vec<i64>> = HashMap::new();

    for track in tracks {
        if let Some(hash) = track.sha256.as_deref().filter(|s| !s.is_empty()) {
            by_hash.entry(hash).or_default().push(track.id);
        }
        if let Some(fp) = track.fingerprint.as_deref().filter(|s| !s.is_empty()) {
            by_fingerprint.entry(fp).or_default().push(track.id);
        }
        let title = track.title_norm.as_deref().filter(|s| !s.is_empty());
        if let (Some(artist), Some(title)) = (
            track.artist_norm.as_deref().filter(|s| !s.is_empty()),
            title,
        ) {
            by_artist_title.entry((artist, title)).or_default().push(track.id);
        }
        if let (Some(album), Some(title)) = (
            track.album_norm.as_deref().filter(|s| !s.is_empty()),
            title,
        ) {
            by_album_title.entry((album, title)).or_default().push(track.id);
        }
    }

    add_pairs_for_group(&mut pairs, by_hash, SignalType::Sha256);
    add_pairs_for_group(&mut pairs, by_fingerprint, SignalType::Fingerprint);
    add_pairs_for_group(&mut pairs, by_artist_title, SignalType::ArtistTitle);
    add_pairs_for_group(&mut pairs, by_album_title, SignalType::AlbumTitle);

    pairs
        .into_iter()
        .map(|((a, b), signals)| PairEvidence { a, b, signals })
        .collect()
}

/// The strong-edge subset of the pair evidence.
pub fn strong_edges(evidence: &[PairEvidence]) -> Vec<&PairEvidence> {
    evidence.iter().filter(|p| p.is_strong()).collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::track;
    use super::*;

    #[test]
    fn test_hash_pair_is_strong_on_its_own() {
        let tracks = vec![
            track(1, "/a.mp3", Some("h1"), None, None, None, None),
            track(2, "/b.mp3", Some("h1"), None, None, None, None),
        ];
        let evidence = build_pair_evidence(&tracks);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].signals.len(), 1);
        assert!(evidence[0].signals.contains(&SignalType::Sha256));
        assert!(evidence[0].is_strong());
    }

    #[test]
    fn test_artist_title_alone_is_not_strong() {
        let tracks = vec![
            track(1, "/a.mp3", Some("h1"), None, Some("Queen"), None, Some("Song")),
            track(2, "/b.mp3", Some("h2"), None, Some("Queen"), None, Some("Song")),
        ];
        let evidence = build_pair_evidence(&tracks);
        assert_eq!(evidence.len(), 1);
        let pair = &evidence[0];
        assert_eq!(pair.signal_count(), 1);
        assert!((pair.strength_sum() - 0.6).abs() < 1e-9);
        assert!(!pair.is_strong());
        assert!(strong_edges(&evidence).is_empty());
    }

    #[test]
    fn test_fingerprint_alone_is_not_strong() {
        let tracks = vec![
            track(1, "/a.mp3", Some("h1"), Some("fp"), None, None, None),
            track(2, "/b.mp3", Some("h2"), Some("fp"), None, None, None),
        ];
        let evidence = build_pair_evidence(&tracks);
        assert!(!evidence[0].is_strong());
    }

    #[test]
    fn test_two_metadata_signals_promote() {
        let tracks = vec![
            track(1, "/a.mp3", None, None, Some("Queen"), Some("Opera"), Some("Song")),
            track(2, "/b.mp3", None, None, Some("Queen"), Some("Opera"), Some("Song")),
        ];
        let evidence = build_pair_evidence(&tracks);
        let pair = &evidence[0];
        // artist+title and album+title both fire
        assert_eq!(pair.signal_count(), 2);
        assert!(pair.is_strong());
    }

    #[test]
    fn test_fingerprint_plus_metadata_promotes_by_strength() {
        let pair = PairEvidence {
            a: 1,
            b: 2,
            signals: [SignalType::Fingerprint, SignalType::ArtistTitle].into(),
        };
        assert!((pair.strength_sum() - 1.5).abs() < 1e-9);
        assert!(pair.is_strong());
    }

    #[test]
    fn test_empty_normalized_fields_generate_no_pairs() {
        let mut a = track(1, "/a.mp3", None, None, None, None, Some("Song"));
        let mut b = track(2, "/b.mp3", None, None, None, None, Some("Song"));
        a.artist_norm = Some(String::new());
        b.artist_norm = Some(String::new());
        assert!(build_pair_evidence(&[a, b]).is_empty());
    }

    #[test]
    fn test_pairs_are_unordered_and_unique() {
        let tracks = vec![
            track(3, "/c.mp3", Some("h"), None, None, None, None),
            track(1, "/a.mp3", Some("h"), None, None, None, None),
            track(2, "/b.mp3", Some("h"), None, None, None, None),
        ];
        let evidence = build_pair_evidence(&tracks);
        let pairs: Vec<(i64, i64)> = evidence.iter().map(|p| (p.a, p.b)).collect();
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
    }
}
