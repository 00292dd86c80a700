//! Embedding provider implementations.
//!
//! - **[`OpenAiEmbedder`]** — calls the OpenAI embeddings API with
//!   batching, retry, and backoff. Requires `OPENAI_API_KEY`.
//! - **[`OllamaEmbedder`]** — calls a local Ollama instance's
//!   `/api/embed` endpoint.
//! - **`LocalEmbedder`** — runs models in-process via fastembed
//!   (feature `local-embeddings-fastembed`); no network calls after the
//!   model download.
//!
//! All providers return vectors in input order and L2-normalize them
//! when asked, so the retrieval layer can treat similarity as a plain
//! dot product.
//!
//! # Retry Strategy
//!
//! Transient errors use exponential backoff: HTTP 429 and 5xx retry,
//! other 4xx fail immediately, network errors retry.
//! Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use askbase_core::embedding::{normalize, Embedder};
use askbase_core::error::StageError;

use crate::config::EmbeddingConfig;

/// Create the configured [`Embedder`].
///
/// There is no "disabled" embedder: retrieval cannot exist without
/// embeddings, so an unknown or unavailable provider is an error and the
/// engine treats it as fatal to initialization.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, StageError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Box::new(local::LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(StageError::Embedding(
            "local embedding provider requires --features local-embeddings-fastembed".to_string(),
        )),
        other => Err(StageError::Embedding(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

/// POST a JSON body with the shared retry/backoff policy, returning the
/// parsed response JSON.
async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    max_retries: u32,
    stage: fn(String) -> StageError,
) -> Result<Value, StageError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|e| stage(format!("invalid response from {url}: {e}")));
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(stage(format!("{url} returned {status}: {body_text}")));
                    continue;
                }
                return Err(stage(format!("{url} returned {status}: {body_text}")));
            }
            Err(e) => {
                last_err = Some(stage(format!("request to {url} failed: {e}")));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| stage("request failed after retries".to_string())))
}

fn build_client(timeout_secs: u64, stage: fn(String) -> StageError) -> Result<reqwest::Client, StageError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| stage(format!("failed to build HTTP client: {e}")))
}

// ============ OpenAI ============

/// Embedding provider using the OpenAI `POST /v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
    model: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, StageError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            StageError::Embedding("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs, StageError::Embedding)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(
        &self,
        texts: &[String],
        normalize_vectors: bool,
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size.max(1)) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_json_with_retry(
                &self.client,
                "https://api.openai.com/v1/embeddings",
                Some(&self.api_key),
                &body,
                self.max_retries,
                StageError::Embedding,
            )
            .await?;
            vectors.extend(parse_openai_embeddings(&json, batch.len())?);
        }

        if normalize_vectors {
            for vec in &mut vectors {
                normalize(vec);
            }
        }
        Ok(vectors)
    }
}

fn parse_openai_embeddings(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>, StageError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| StageError::Embedding("missing data array in response".to_string()))?;
    if data.len() != expected {
        return Err(StageError::Embedding(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }

    data.iter()
        .map(|item| {
            item.get("embedding")
                .and_then(|e| e.as_array())
                .map(|values| {
                    values
                        .iter()
                        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                        .collect()
                })
                .ok_or_else(|| StageError::Embedding("missing embedding in response".to_string()))
        })
        .collect()
}

// ============ Ollama ============

/// Embedding provider using a local Ollama instance's `POST /api/embed`.
pub struct OllamaEmbedder {
    model: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, StageError> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        Ok(Self {
            model: config.model.clone(),
            url,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs, StageError::Embedding)?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(
        &self,
        texts: &[String],
        normalize_vectors: bool,
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        let endpoint = format!("{}/api/embed", self.url);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size.max(1)) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_json_with_retry(
                &self.client,
                &endpoint,
                None,
                &body,
                self.max_retries,
                StageError::Embedding,
            )
            .await?;
            vectors.extend(parse_ollama_embeddings(&json, batch.len())?);
        }

        if normalize_vectors {
            for vec in &mut vectors {
                normalize(vec);
            }
        }
        Ok(vectors)
    }
}

fn parse_ollama_embeddings(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>, StageError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| StageError::Embedding("missing embeddings array in response".to_string()))?;
    if embeddings.len() != expected {
        return Err(StageError::Embedding(format!(
            "expected {expected} embeddings, got {}",
            embeddings.len()
        )));
    }

    embeddings
        .iter()
        .map(|row| {
            row.as_array()
                .map(|values| {
                    values
                        .iter()
                        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                        .collect()
                })
                .ok_or_else(|| StageError::Embedding("embedding is not an array".to_string()))
        })
        .collect()
}

// ============ Local (fastembed) ============

#[cfg(feature = "local-embeddings-fastembed")]
mod local {
    use super::*;

    /// In-process embedding via fastembed. The model is downloaded on
    /// first use and cached; afterwards encoding runs fully offline.
    pub struct LocalEmbedder {
        model: String,
    }

    impl LocalEmbedder {
        pub fn new(config: &EmbeddingConfig) -> Result<Self, StageError> {
            // Validate the model name up front so a typo fails
            // initialization instead of the first encode.
            fastembed_model(&config.model)?;
            Ok(Self {
                model: config.model.clone(),
            })
        }
    }

    fn fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel, StageError> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
            other => Err(StageError::Embedding(format!(
                "unknown local embedding model: '{other}'. Supported: all-minilm-l6-v2, \
                 bge-small-en-v1.5, bge-base-en-v1.5, multilingual-e5-small, multilingual-e5-base"
            ))),
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model
        }

        async fn encode(
            &self,
            texts: &[String],
            normalize_vectors: bool,
            batch_size: usize,
        ) -> Result<Vec<Vec<f32>>, StageError> {
            let model = fastembed_model(&self.model)?;
            let texts = texts.to_vec();
            let batch_size = batch_size.max(1);

            let mut vectors = tokio::task::spawn_blocking(move || {
                let mut embedder = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(model).with_show_download_progress(false),
                )
                .map_err(|e| {
                    StageError::Embedding(format!("failed to initialize local model: {e}"))
                })?;
                embedder
                    .embed(texts, Some(batch_size))
                    .map_err(|e| StageError::Embedding(format!("local embedding failed: {e}")))
            })
            .await
            .map_err(|e| StageError::Embedding(format!("local embedding task failed: {e}")))??;

            if normalize_vectors {
                for vec in &mut vectors {
                    normalize(vec);
                }
            }
            Ok(vectors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_parse_openai_embeddings() {
        let json = serde_json::json!({
            "data": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3, 0.4]},
            ]
        });
        let vectors = parse_openai_embeddings(&json, 2).unwrap();
        assert_eq!(vectors.len(), 2);
        assert!((vectors[1][0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_parse_openai_count_mismatch() {
        let json = serde_json::json!({"data": [{"embedding": [0.1]}]});
        assert!(parse_openai_embeddings(&json, 2).is_err());
    }

    #[test]
    fn test_parse_ollama_embeddings() {
        let json = serde_json::json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]});
        let vectors = parse_ollama_embeddings(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_ollama_malformed() {
        let json = serde_json::json!({"embeddings": "nope"});
        assert!(parse_ollama_embeddings(&json, 1).is_err());
    }
}
