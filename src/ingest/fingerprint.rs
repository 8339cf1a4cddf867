//! Best-effort acoustic fingerprinting via Chromaprint/fpcalc.
//!
//! Shells out to the `fpcalc` command-line tool (part of Chromaprint).
//! Fingerprinting is strictly optional: a missing binary, a decode
//! failure, malformed output or any other problem yields `None`, never
//! an error that could abort the surrounding scan. Exact-hash and
//! metadata signals still work without it.
//!
//! Install fpcalc:
//! - Windows: `winget install AcoustID.Chromaprint`
//! - macOS: `brew install chromaprint`
//! - Linux: `apt install libchromaprint-tools` or equivalent

use std::path::Path;
use std::process::Command;

/// Common installation paths for fpcalc on Windows
#[cfg(windows)]
const FPCALC_PATHS: &[&str] = &[
    "fpcalc", // In PATH
    r"C:\Program Files\Chromaprint\fpcalc.exe",
    r"C:\Program Files\MusicBrainz Picard\fpcalc.exe",
    r"C:\Program Files (x86)\Chromaprint\fpcalc.exe",
    r"C:\Program Files (x86)\MusicBrainz Picard\fpcalc.exe",
];

#[cfg(not(windows))]
const FPCALC_PATHS: &[&str] = &[
    "fpcalc", // In PATH
    "/usr/bin/fpcalc",
    "/usr/local/bin/fpcalc",
    "/opt/homebrew/bin/fpcalc",
];

/// Find the fpcalc executable, checking common installation paths
fn find_fpcalc() -> Option<&'static str> {
    FPCALC_PATHS
        .iter()
        .find(|&path| {
            Command::new(path)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .map(|v| v as _)
}

/// fpcalc JSON output structure
#[derive(serde::Deserialize)]
struct FpcalcOutput {
    fingerprint: String,
}

fn parse_fpcalc_json(json: &str) -> Option<String> {
    let parsed: FpcalcOutput = serde_json::from_str(json).ok()?;
    if parsed.fingerprint.is_empty() {
        return None;
    }
    Some(parsed.fingerprint)
}

/// Compute an acoustic fingerprint for the given file, best-effort.
///
/// Returns `None` on every failure path: fpcalc not installed, the tool
/// exiting non-zero, unparseable output, or an empty fingerprint.
pub fn compute_fingerprint(path: &Path) -> Option<String> {
    let fpcalc = match find_fpcalc() {
        Some(f) => f,
        None => {
            tracing::debug!(target: "ingest::fingerprint", "fpcalc not found, skipping fingerprints");
            return None;
        }
    };

    let output = match Command::new(fpcalc).arg("-json").arg(path).output() {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(target: "ingest::fingerprint", error = %e, path = %path.display(), "fpcalc failed to run");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            target: "ingest::fingerprint",
            path = %path.display(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "fpcalc exited with failure"
        );
        return None;
    }

    parse_fpcalc_json(&String::from_utf8_lossy(&output.stdout))
}

/// Check if fpcalc is available on the system
pub fn is_fpcalc_available() -> bool {
    find_fpcalc().is_some()
}
