//! Pairwise relevance scoring for shortlist reranking.
//!
//! Wraps a cross-encoder served behind the text-embeddings-inference
//! `/rerank` endpoint: one batched call scores every (question, text)
//! pair more deeply than the bi-encoder similarity pass. The engine
//! treats this stage as optional — construction or scoring failures
//! leave the shortlist in retrieval order.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use askbase_core::error::StageError;
use askbase_core::scorer::PairScorer;

use crate::config::RerankConfig;

/// Create the configured [`PairScorer`], or `None` when disabled.
pub fn create_pair_scorer(config: &RerankConfig) -> Result<Option<Box<dyn PairScorer>>, StageError> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "tei" => Ok(Some(Box::new(TeiReranker::new(config)?))),
        other => Err(StageError::Rerank(format!(
            "unknown rerank provider: {other}"
        ))),
    }
}

/// Cross-encoder reranking via a text-embeddings-inference server.
///
/// Sends `{"query", "texts"}` to `POST {url}/rerank` and restores the
/// returned `{"index", "score"}` entries to input order.
pub struct TeiReranker {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl TeiReranker {
    pub fn new(config: &RerankConfig) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StageError::Rerank(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            model: config.model.clone(),
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl PairScorer for TeiReranker {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn score(&self, question: &str, texts: &[String]) -> Result<Vec<f32>, StageError> {
        let endpoint = format!("{}/rerank", self.url);
        let body = serde_json::json!({
            "query": question,
            "texts": texts,
        });

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::Rerank(format!("request to {endpoint} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(StageError::Rerank(format!(
                "{endpoint} returned {status}: {body_text}"
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| StageError::Rerank(format!("invalid response from {endpoint}: {e}")))?;
        parse_rerank_response(&json, texts.len())
    }
}

/// Restore the server's score entries (sorted by relevance) to input
/// order: one score per input text.
fn parse_rerank_response(json: &Value, expected: usize) -> Result<Vec<f32>, StageError> {
    let entries = json
        .as_array()
        .ok_or_else(|| StageError::Rerank("response is not an array".to_string()))?;

    let mut scores = vec![0.0f32; expected];
    let mut filled = 0usize;
    for entry in entries {
        let index = entry
            .get("index")
            .and_then(|i| i.as_u64())
            .ok_or_else(|| StageError::Rerank("missing index in response".to_string()))?
            as usize;
        let score = entry.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
        if index >= expected {
            return Err(StageError::Rerank(format!(
                "index {index} out of range for {expected} texts"
            )));
        }
        scores[index] = score;
        filled += 1;
    }

    if filled != expected {
        return Err(StageError::Rerank(format!(
            "expected {expected} scores, got {filled}"
        )));
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider_is_none() {
        let config = RerankConfig::default();
        assert!(create_pair_scorer(&config).unwrap().is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = RerankConfig {
            provider: "colbert".to_string(),
            ..RerankConfig::default()
        };
        assert!(create_pair_scorer(&config).is_err());
    }

    #[test]
    fn test_parse_restores_input_order() {
        // The server returns entries sorted by score, not input order.
        let json = serde_json::json!([
            {"index": 2, "score": 0.9},
            {"index": 0, "score": 0.5},
            {"index": 1, "score": 0.1},
        ]);
        let scores = parse_rerank_response(&json, 3).unwrap();
        assert_eq!(scores, vec![0.5, 0.1, 0.9]);
    }

    #[test]
    fn test_parse_rejects_out_of_range_index() {
        let json = serde_json::json!([{"index": 5, "score": 0.9}]);
        assert!(parse_rerank_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_rejects_short_response() {
        let json = serde_json::json!([{"index": 0, "score": 0.9}]);
        assert!(parse_rerank_response(&json, 2).is_err());
    }
}
