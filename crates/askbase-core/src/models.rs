//! Core data models used throughout askbase.
//!
//! These types represent the documents, chunks, and answers that flow
//! through the retrieval and extraction pipeline.

use serde::{Deserialize, Serialize};

/// Source attributed to engine-generated messages (not-ready, empty
/// corpus, query failure) instead of a document title.
pub const SYSTEM_SOURCE: &str = "system";

/// A raw knowledge-base document before chunking.
///
/// One per corpus file; not retained by the engine after chunking.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name of the source (e.g. `"farmacia.txt"`).
    pub title: String,
    /// Full UTF-8 text content.
    pub content: String,
}

/// A bounded slice of document text — the atomic unit of retrieval
/// and caching.
///
/// `id` is a dense 0-based sequence number assigned in document-then-
/// position order across the whole corpus. The ordered chunk sequence is
/// an invariant: cache validity depends on count and order matching, and
/// row `i` of the embedding matrix always corresponds to chunk `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    /// Title of the owning document (lookup-only back-reference).
    pub title: String,
    pub text: String,
}

/// Size and modification metadata for one corpus file, used as
/// fingerprint input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFileStat {
    /// File name (not the full path).
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Modification time truncated to whole seconds since the epoch.
    pub mtime_secs: i64,
}

/// The engine's outward answer: response text plus a `", "`-joined list
/// of contributing document titles (or [`SYSTEM_SOURCE`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub source: String,
}

impl Answer {
    /// An engine-generated message attributed to the system rather than
    /// to any document.
    pub fn system(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            source: SYSTEM_SOURCE.to_string(),
        }
    }
}
