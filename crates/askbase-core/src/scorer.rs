//! Scoring-provider traits for the optional pipeline stages.
//!
//! Both collaborators are opaque to the engine: a question-answering
//! scorer that extracts a focused span from context, and a pairwise
//! relevance scorer used to rerank the retrieval shortlist. Either may
//! be absent; the engine degrades that stage rather than failing.

use async_trait::async_trait;

use crate::error::StageError;

/// A candidate span answer with the scorer's confidence.
#[derive(Debug, Clone)]
pub struct SpanAnswer {
    pub answer: String,
    pub score: f32,
}

/// Extractive question-answering scorer.
#[async_trait]
pub trait AnswerScorer: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;

    /// Extract a candidate answer span from `context` for `question`,
    /// with a confidence score.
    async fn answer(&self, question: &str, context: &str) -> Result<SpanAnswer, StageError>;
}

/// Pairwise (question, text) relevance scorer.
///
/// Scores every `(question, text)` pair in one batched call, returning
/// one score per input text in input order.
#[async_trait]
pub trait PairScorer: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;

    async fn score(&self, question: &str, texts: &[String]) -> Result<Vec<f32>, StageError>;
}
