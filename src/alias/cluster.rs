//! Duplicate cluster resolution.
//!
//! Connected components over strong edges via a deterministic union-find,
//! enriched with per-cluster signal counts, an optimistic confidence
//! score and a canonical candidate. Advisory and read-only: recomputed on
//! every call, never cached, never written back.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::alias::{self, PairEvidence, SignalType};
use crate::model::TrackRecord;

/// Union-find keyed by track id.
///
/// Determinism rule: on union, the numerically smaller root always wins,
/// so membership and root assignment are identical regardless of edge
/// iteration order.
#[derive(Debug, Default)]
struct UnionFind {
    parent: HashMap<i64, i64>,
}

impl UnionFind {
    fn find(&mut self, x: i64) -> i64 {
        let mut root = *self.parent.entry(x).or_insert(x);
        while self.parent[&root] != root {
            root = self.parent[&root];
        }
        // Path compression
        let mut cur = x;
        while self.parent[&cur] != root {
            let next = self.parent[&cur];
            self.parent.insert(cur, root);
            cur = next;
        }
        root
    }

    fn union(&mut self, a: i64, b: i64) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        if ra < rb {
            self.parent.insert(rb, ra);
        } else {
            self.parent.insert(ra, rb);
        }
    }
}

/// One member of a cluster, for display.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMember {
    pub id: i64,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub original_path: String,
}

/// One resolved duplicate cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterRecord {
    /// The deterministic union-find root; stable across runs for a fixed
    /// track set, but carries no identity beyond that
    pub cluster_id: i64,
    pub size: usize,
    pub confidence: f64,
    /// Per-signal-type counts over pairs internal to this cluster
    pub signals: BTreeMap<SignalType, usize>,
    pub canonical_candidate_id: i64,
    pub members: Vec<ClusterMember>,
}

/// Summary numbers over all clusters of size >= 2.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterStats {
    pub cluster_count: usize,
    pub largest_cluster: usize,
    pub average_size: f64,
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Optimistic confidence model.
///
/// Errs on the side of grouping; a human can always split later. The
/// constants are preserved heuristics, not tunables.
pub fn compute_confidence(size: usize, signals: &BTreeMap<SignalType, usize>) -> f64 {
    let mut score = 0.0;

    if signals.get(&SignalType::Sha256).copied().unwrap_or(0) > 0 {
        score += 0.50;
    }
    if signals.get(&SignalType::Fingerprint).copied().unwrap_or(0) > 0 {
        score += 0.30;
    }

    let meta_hits = signals.get(&SignalType::ArtistTitle).copied().unwrap_or(0)
        + signals.get(&SignalType::AlbumTitle).copied().unwrap_or(0);
    if meta_hits > 0 {
        score += f64::min(0.20, meta_hits as f64 * 0.05);
    }

    if size >= 3 {
        score += 0.05;
    }
    if size >= 5 {
        score += 0.05;
    }

    round3(score.min(1.0))
}

/// Deterministic canonical pick: most of {artist, album, title} present,
/// then shortest original path, then lowest id.
fn choose_canonical(members: &[i64], by_id: &HashMap<i64, &TrackRecord>) -> i64 {
    let mut best: Option<(usize, usize, i64)> = None;
    let mut best_id = members[0];
    for &id in members {
        let Some(track) = by_id.get(&id) else { continue };
        let key = (
            3 - track.metadata_presence(), // fewer missing fields is better
            track.original_path.len(),
            id,
        );
        if best.is_none_or(|b| key < b) {
            best = Some(key);
            best_id = id;
        }
    }
    best_id
}

/// Resolve duplicate clusters over the given track set.
///
/// Returned clusters have at least `min_size` members, members sorted by
/// id, and are ordered larger-first, then by root id.
pub fn build_clusters(tracks: &[TrackRecord], min_size: usize) -> Vec<ClusterRecord> {
    let min_size = min_size.max(2);
    let evidence = alias::build_pair_evidence(tracks);
    let strong: Vec<&PairEvidence> = alias::strong_edges(&evidence);

    let mut uf = UnionFind::default();
    for edge in &strong {
        uf.union(edge.a, edge.b);
    }

    let nodes: Vec<i64> = uf.parent.keys().copied().collect();
    let mut components: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for node in nodes {
        let root = uf.find(node);
        components.entry(root).or_default().push(node);
    }

    let by_id: HashMap<i64, &TrackRecord> = tracks.iter().map(|t| (t.id, t)).collect();

    let mut clusters = Vec::new();
    for (root, mut members) in components {
        if members.len() < min_size {
            continue;
        }
        members.sort_unstable();

        // Signal counts over all evidence internal to the cluster, strong
        // or not; weak corroboration still raises confidence.
        let mut signals: BTreeMap<SignalType, usize> = BTreeMap::new();
        for pair in &evidence {
            if members.binary_search(&pair.a).is_ok() && members.binary_search(&pair.b).is_ok() {
                for signal in &pair.signals {
                    *signals.entry(*signal).or_default() += 1;
                }
            }
        }

        let confidence = compute_confidence(members.len(), &signals);
        let canonical_candidate_id = choose_canonical(&members, &by_id);

        let member_records = members
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|t| ClusterMember {
                id: t.id,
                artist: t.artist.clone(),
                album: t.album.clone(),
                title: t.title.clone(),
                original_path: t.original_path.clone(),
            })
            .collect();

        clusters.push(ClusterRecord {
            cluster_id: root,
            size: members.len(),
            confidence,
            signals,
            canonical_candidate_id,
            members: member_records,
        });
    }

    // Larger clusters first, then by root for a stable listing
    clusters.sort_by_key(|c| (std::cmp::Reverse(c.size), c.cluster_id));
    clusters
}

/// Summary statistics over the resolved clusters.
pub fn cluster_stats(clusters: &[ClusterRecord]) -> ClusterStats {
    if clusters.is_empty() {
        return ClusterStats {
            cluster_count: 0,
            largest_cluster: 0,
            average_size: 0.0,
        };
    }
    let sizes: Vec<usize> = clusters.iter().map(|c| c.size).collect();
    ClusterStats {
        cluster_count: sizes.len(),
        largest_cluster: sizes.iter().copied().max().unwrap_or(0),
        average_size: round3(sizes.iter().sum::<usize>() as f64 / sizes.len() as f64),
    }
}
