//! Similarity ranking over the in-memory embedding matrix.
//!
//! All vectors are unit-normalized before they reach this module, so
//! cosine similarity reduces to the inner product and ranking is one
//! dot product per chunk. Ordering is deterministic: descending score
//! with ties broken by original chunk order (stable sort), which keeps
//! retrieval reproducible across runs.

use crate::embedding::dot;

/// Rank every matrix row against a query vector.
///
/// Returns `(chunk index, score)` pairs in descending score order,
/// truncated to `min(pre_k, rows)`. Ties preserve original chunk order.
pub fn rank(embeddings: &[Vec<f32>], query: &[f32], pre_k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = embeddings
        .iter()
        .enumerate()
        .map(|(i, row)| (i, dot(row, query)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(pre_k.min(embeddings.len()));
    scored
}

/// Index permutation sorting `scores` descending, stable on ties.
///
/// Used to apply reranker scores to a shortlist while preserving the
/// shortlist's order among equal scores.
pub fn stable_desc_order(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}
