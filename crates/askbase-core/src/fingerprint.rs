//! Corpus + configuration fingerprinting for cache validity.
//!
//! A fingerprint identifies one exact (corpus, chunking config, embedding
//! model) combination. Any change to those inputs yields a different
//! digest, so stale cache entries are bypassed naturally — they are keyed
//! by a fingerprint nothing computes anymore.

use sha2::{Digest, Sha256};

use crate::models::CorpusFileStat;

/// Length of the hex fingerprint embedded in cache file names.
pub const FINGERPRINT_LEN: usize = 16;

/// Compute the cache fingerprint for a corpus and chunking configuration.
///
/// Hashes the embedding model name, chunk geometry, and for each corpus
/// file its name, byte size, and second-truncated modification time.
/// Files are sorted by name internally, so the digest is independent of
/// directory listing order.
///
/// Deterministic: identical inputs always produce the same digest
/// (SHA-256, truncated to [`FINGERPRINT_LEN`] hex chars).
pub fn fingerprint(
    model_name: &str,
    chunk_chars: usize,
    chunk_overlap: usize,
    files: &[CorpusFileStat],
) -> String {
    let mut sorted: Vec<&CorpusFileStat> = files.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.update(chunk_chars.to_string().as_bytes());
    hasher.update(chunk_overlap.to_string().as_bytes());
    for stat in sorted {
        hasher.update(stat.name.as_bytes());
        hasher.update(stat.size.to_string().as_bytes());
        hasher.update(stat.mtime_secs.to_string().as_bytes());
    }

    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}
