//! Embedding provider trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for normalization, similarity, and the binary
//! matrix encoding used by the cache store.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `askbase`
//! app crate.

use async_trait::async_trait;

use crate::error::StageError;

/// Trait for embedding providers.
///
/// The engine requires an embedder: retrieval cannot exist without one,
/// so a provider that fails to construct is fatal to initialization
/// (unlike the optional QA and reranker scorers).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;

    /// Encode a batch of texts into one vector per text, in input order.
    ///
    /// When `normalize` is true each returned vector is unit-length, so
    /// cosine similarity reduces to the dot product. Deterministic for a
    /// fixed model and input.
    async fn encode(
        &self,
        texts: &[String],
        normalize: bool,
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, StageError>;
}

/// Scale a vector to unit L2 norm in place.
///
/// Zero (or numerically negligible) vectors are left unchanged.
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

/// Inner product of two vectors.
///
/// For unit-normalized inputs this equals their cosine similarity.
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Encode an embedding matrix as a binary blob.
///
/// Layout: `u32` row count, `u32` dimensionality, then row-major `f32`
/// values — all little-endian. Rows are assumed uniform in length.
pub fn matrix_to_blob(matrix: &[Vec<f32>]) -> Vec<u8> {
    let rows = matrix.len() as u32;
    let dims = matrix.first().map_or(0, |r| r.len()) as u32;

    let mut bytes = Vec::with_capacity(8 + matrix.len() * dims as usize * 4);
    bytes.extend_from_slice(&rows.to_le_bytes());
    bytes.extend_from_slice(&dims.to_le_bytes());
    for row in matrix {
        debug_assert_eq!(row.len(), dims as usize);
        for &v in row {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    bytes
}

/// Decode a binary blob back into an embedding matrix.
///
/// Reverses [`matrix_to_blob`]. Fails with [`StageError::Cache`] when the
/// header is truncated or the body length disagrees with the header.
pub fn blob_to_matrix(blob: &[u8]) -> Result<Vec<Vec<f32>>, StageError> {
    if blob.len() < 8 {
        return Err(StageError::Cache(format!(
            "embedding blob too short: {} bytes",
            blob.len()
        )));
    }

    let rows = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
    let dims = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]) as usize;

    let expected = 8 + rows
        .checked_mul(dims)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| StageError::Cache("embedding blob header overflow".to_string()))?;
    if blob.len() != expected {
        return Err(StageError::Cache(format!(
            "embedding blob size mismatch: {} bytes for {}x{} matrix",
            blob.len(),
            rows,
            dims
        )));
    }

    let mut matrix = Vec::with_capacity(rows);
    let mut off = 8;
    for _ in 0..rows {
        let mut row = Vec::with_capacity(dims);
        for _ in 0..dims {
            row.push(f32::from_le_bytes([
                blob[off],
                blob[off + 1],
                blob[off + 2],
                blob[off + 3],
            ]));
            off += 4;
        }
        matrix.push(row);
    }
    Ok(matrix)
}
