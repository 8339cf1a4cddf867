//! Source-tree discovery of audio files.

use futures::stream::Stream;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Extensions the ingestion pipeline will analyze (case-insensitive).
/// The extension check is a fast filter; lofty does the real parsing.
pub const SUPPORTED_EXTS: &[&str] = &["mp3", "flac", "wav", "m4a", "ogg", "aac", "opus"];

/// Check if a path has a supported audio file extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTS.contains(&ext.as_str()))
}

/// Scans the given root directory recursively for audio files.
///
/// Returns a Stream of PathBufs. The synchronous walk runs on a blocking
/// task so callers can process entries while the traversal continues.
pub fn scan(root: PathBuf) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    tokio::task::spawn_blocking(move || {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_audio_file(entry.path()) {
                // If the receiver is dropped, stop scanning.
                if tx.blocking_send(entry.path().to_path_buf()).is_err() {
                    break;
                }
            }
        }
    });

    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}
