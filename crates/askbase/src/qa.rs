//! Question-answering span extraction provider.
//!
//! Wraps a hosted extractive QA pipeline (the Hugging Face inference
//! question-answering task): given a question and a context, the model
//! returns the most likely answer span and a confidence score. The
//! engine treats this stage as optional — construction or scoring
//! failures degrade to the extractive fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use askbase_core::error::StageError;
use askbase_core::scorer::{AnswerScorer, SpanAnswer};

use crate::config::QaConfig;

/// Create the configured [`AnswerScorer`], or `None` when disabled.
pub fn create_answer_scorer(
    config: &QaConfig,
) -> Result<Option<Box<dyn AnswerScorer>>, StageError> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "hf-inference" => Ok(Some(Box::new(HfQaScorer::new(config)?))),
        other => Err(StageError::Qa(format!("unknown qa provider: {other}"))),
    }
}

/// Extractive QA via the Hugging Face inference API.
///
/// Sends `{"inputs": {"question", "context"}}` to
/// `POST {url}/models/{model}`; uses the `HF_API_TOKEN` environment
/// variable as a bearer token when present.
pub struct HfQaScorer {
    model: String,
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HfQaScorer {
    pub fn new(config: &QaConfig) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StageError::Qa(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            model: config.model.clone(),
            url: config.url.clone(),
            token: std::env::var("HF_API_TOKEN").ok(),
            client,
        })
    }
}

#[async_trait]
impl AnswerScorer for HfQaScorer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, question: &str, context: &str) -> Result<SpanAnswer, StageError> {
        let endpoint = format!("{}/models/{}", self.url, self.model);
        let body = serde_json::json!({
            "inputs": {
                "question": question,
                "context": context,
            }
        });

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StageError::Qa(format!("request to {endpoint} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(StageError::Qa(format!(
                "{endpoint} returned {status}: {body_text}"
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| StageError::Qa(format!("invalid response from {endpoint}: {e}")))?;
        parse_qa_response(&json)
    }
}

/// Parse the QA pipeline output: an `{"answer", "score"}` object, or a
/// one-element array of the same shape (the API returns both forms).
fn parse_qa_response(json: &Value) -> Result<SpanAnswer, StageError> {
    let obj = match json {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| StageError::Qa("empty response array".to_string()))?,
        other => other,
    };

    let answer = obj
        .get("answer")
        .and_then(|a| a.as_str())
        .ok_or_else(|| StageError::Qa("missing answer in response".to_string()))?
        .to_string();
    let score = obj.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;

    Ok(SpanAnswer { answer, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider_is_none() {
        let config = QaConfig::default();
        assert!(create_answer_scorer(&config).unwrap().is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = QaConfig {
            provider: "bert-local".to_string(),
            ..QaConfig::default()
        };
        assert!(create_answer_scorer(&config).is_err());
    }

    #[test]
    fn test_parse_object_response() {
        let json = serde_json::json!({"answer": "medicamentos gratuitos", "score": 0.42});
        let span = parse_qa_response(&json).unwrap();
        assert_eq!(span.answer, "medicamentos gratuitos");
        assert!((span.score - 0.42).abs() < 1e-6);
    }

    #[test]
    fn test_parse_array_response() {
        let json = serde_json::json!([{"answer": "sim", "score": 0.9}]);
        let span = parse_qa_response(&json).unwrap();
        assert_eq!(span.answer, "sim");
    }

    #[test]
    fn test_parse_missing_answer() {
        let json = serde_json::json!({"score": 0.9});
        assert!(parse_qa_response(&json).is_err());
    }
}
