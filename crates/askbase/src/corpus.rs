//! Knowledge-base loading.
//!
//! The corpus is every `*.txt` file directly under one directory, read
//! as UTF-8, one [`Document`] per file. Loading never fails the engine:
//! a missing directory yields an empty corpus, and unreadable or empty
//! files are skipped — each case with a warning.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use askbase_core::models::{CorpusFileStat, Document};

/// Load every non-empty `*.txt` file in `dir` as a document.
///
/// Documents are returned sorted by file name so chunk ids are
/// deterministic regardless of directory listing order.
pub fn load_documents(dir: &Path) -> Vec<Document> {
    let mut documents = Vec::new();

    for path in txt_files(dir) {
        let title = file_name(&path);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let content = content.trim().to_string();
                if content.is_empty() {
                    warn!(file = %path.display(), "skipping empty document");
                } else {
                    documents.push(Document { title, content });
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read document, skipping");
            }
        }
    }

    documents
}

/// Size and modification stats for every `*.txt` file in `dir`, used as
/// fingerprint input. Modification times are truncated to whole seconds.
pub fn corpus_stats(dir: &Path) -> Vec<CorpusFileStat> {
    let mut stats = Vec::new();

    for path in txt_files(dir) {
        match std::fs::metadata(&path) {
            Ok(meta) => {
                let mtime_secs = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                stats.push(CorpusFileStat {
                    name: file_name(&path),
                    size: meta.len(),
                    mtime_secs,
                });
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to stat corpus file");
            }
        }
    }

    stats
}

/// The `*.txt` files directly under `dir`, sorted by file name.
/// A missing or unreadable directory is an empty corpus, not an error.
fn txt_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "knowledge base directory unavailable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();

    files.sort();
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
