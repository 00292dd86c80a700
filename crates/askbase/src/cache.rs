//! Fingerprint-keyed cache of chunks and embeddings.
//!
//! Two artifacts per fingerprint: `chunks-<fp>.json` (the chunk records)
//! and `embeddings-<fp>.bin` (the matrix in the binary layout of
//! [`askbase_core::embedding::matrix_to_blob`]). A changed corpus or
//! configuration produces a different fingerprint, so stale entries are
//! bypassed rather than mutated; they are never deleted automatically.
//!
//! Every operation here is best-effort: a load problem is a logged miss
//! and a save problem is a logged warning. The engine always keeps
//! serving from memory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use askbase_core::embedding::{blob_to_matrix, matrix_to_blob};
use askbase_core::error::StageError;
use askbase_core::models::Chunk;

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the cache directory if absent. Failure is non-fatal — the
    /// subsequent save will fail and be logged, and the engine serves
    /// from memory.
    pub fn ensure_dir(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "could not create cache directory");
        }
    }

    fn chunks_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("chunks-{fingerprint}.json"))
    }

    fn embeddings_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("embeddings-{fingerprint}.bin"))
    }

    /// Load the cache entry for `fingerprint`.
    ///
    /// Returns `None` (a miss, with the cause logged) unless both
    /// artifacts exist, parse, agree with each other, and the chunk
    /// count equals `expected_chunks` from the current corpus.
    pub fn load(&self, fingerprint: &str, expected_chunks: usize) -> Option<(Vec<Chunk>, Vec<Vec<f32>>)> {
        match self.try_load(fingerprint, expected_chunks) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(fingerprint, error = %e, "cache miss");
                None
            }
        }
    }

    fn try_load(
        &self,
        fingerprint: &str,
        expected_chunks: usize,
    ) -> Result<(Vec<Chunk>, Vec<Vec<f32>>), StageError> {
        let chunks_path = self.chunks_path(fingerprint);
        let embeddings_path = self.embeddings_path(fingerprint);
        if !chunks_path.exists() || !embeddings_path.exists() {
            return Err(StageError::Cache("no cache entry".to_string()));
        }

        let chunk_json = std::fs::read_to_string(&chunks_path)
            .map_err(|e| StageError::Cache(format!("read {}: {e}", chunks_path.display())))?;
        let chunks: Vec<Chunk> = serde_json::from_str(&chunk_json)
            .map_err(|e| StageError::Cache(format!("parse {}: {e}", chunks_path.display())))?;
        if chunks.len() != expected_chunks {
            return Err(StageError::Cache(format!(
                "chunk count changed: cached {}, corpus {}",
                chunks.len(),
                expected_chunks
            )));
        }

        let blob = std::fs::read(&embeddings_path)
            .map_err(|e| StageError::Cache(format!("read {}: {e}", embeddings_path.display())))?;
        let embeddings = blob_to_matrix(&blob)?;
        if embeddings.len() != chunks.len() {
            return Err(StageError::Cache(format!(
                "embedding rows ({}) do not match chunks ({})",
                embeddings.len(),
                chunks.len()
            )));
        }

        Ok((chunks, embeddings))
    }

    /// Persist a cache entry. Best-effort: failures are logged, never
    /// propagated.
    pub fn save(&self, fingerprint: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) {
        let chunks_path = self.chunks_path(fingerprint);
        match serde_json::to_string(chunks) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&chunks_path, json) {
                    warn!(file = %chunks_path.display(), error = %e, "failed to save chunk cache");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize chunk cache");
                return;
            }
        }

        let embeddings_path = self.embeddings_path(fingerprint);
        if let Err(e) = std::fs::write(&embeddings_path, matrix_to_blob(embeddings)) {
            warn!(file = %embeddings_path.display(), error = %e, "failed to save embedding cache");
        }
    }

    /// The cache directory (for diagnostics).
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
