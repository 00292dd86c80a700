//! Typed per-stage errors for the query pipeline.

use thiserror::Error;

/// Errors attributable to one pipeline stage.
///
/// The orchestrator decides what each stage failure means: embedding
/// failures are fatal to initialization, QA/reranker failures degrade
/// that stage, cache and corpus failures degrade to recomputation or an
/// empty corpus. Nothing here ever reaches an end user directly — the
/// engine converts failures into system-source answers at its boundary.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("embedding model error: {0}")]
    Embedding(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("answer model error: {0}")]
    Qa(String),

    #[error("reranker error: {0}")]
    Rerank(String),
}
