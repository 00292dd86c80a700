//! TOML configuration surface for the engine and CLI.
//!
//! Every field is defaulted, so an absent config file yields a fully
//! working local setup (Ollama embeddings, no QA scorer, no reranker).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use askbase_core::extract::{MAX_SUMMARY_CHARS, MIN_DIRECT_ANSWER_CHARS, MIN_QA_CONFIDENCE};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Directory holding the `*.txt` knowledge-base files.
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
        }
    }
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("knowledge_base")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    /// Characters shared between consecutive windows of a long paragraph.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_chars() -> usize {
    700
}
fn default_chunk_overlap() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks handed to answer extraction.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Similarity shortlist width before reranking.
    /// Defaults to `max(3 * top_k, top_k)`.
    #[serde(default)]
    pub pre_k: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            pre_k: None,
        }
    }
}

fn default_top_k() -> usize {
    5
}

impl RetrievalConfig {
    /// The configured `pre_k`, or the `max(3 * top_k, top_k)` default.
    pub fn effective_pre_k(&self) -> usize {
        self.pre_k.unwrap_or(self.top_k.max(self.top_k * 3))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Directory for fingerprint-keyed chunk and embedding artifacts.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"openai"`, `"ollama"`, or `"local"` (feature-gated fastembed).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Service URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct QaConfig {
    /// `"disabled"` or `"hf-inference"`.
    #[serde(default = "default_optional_provider")]
    pub provider: String,
    #[serde(default = "default_qa_model")]
    pub model: String,
    /// Inference endpoint base URL.
    #[serde(default = "default_qa_url")]
    pub url: String,
    /// Minimum confidence for a span to be accepted.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Accepted spans shorter than this are enriched instead of
    /// returned verbatim.
    #[serde(default = "default_min_direct_chars")]
    pub min_direct_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            provider: default_optional_provider(),
            model: default_qa_model(),
            url: default_qa_url(),
            min_confidence: default_min_confidence(),
            min_direct_chars: default_min_direct_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_optional_provider() -> String {
    "disabled".to_string()
}
fn default_qa_model() -> String {
    "deepset/roberta-base-squad2".to_string()
}
fn default_qa_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}
fn default_min_confidence() -> f32 {
    MIN_QA_CONFIDENCE
}
fn default_min_direct_chars() -> usize {
    MIN_DIRECT_ANSWER_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankConfig {
    /// `"disabled"` or `"tei"` (text-embeddings-inference `/rerank`).
    #[serde(default = "default_optional_provider")]
    pub provider: String,
    /// Model identifier, informational — the TEI server decides which
    /// cross-encoder it actually runs.
    #[serde(default = "default_rerank_model")]
    pub model: String,
    #[serde(default = "default_rerank_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: default_optional_provider(),
            model: default_rerank_model(),
            url: default_rerank_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_rerank_model() -> String {
    "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string()
}
fn default_rerank_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// Introductory phrase for extractive answers with no QA seed.
    #[serde(default = "default_intro")]
    pub intro: String,
    /// Upper bound in characters for the assembled summary.
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            intro: default_intro(),
            max_summary_chars: default_max_summary_chars(),
        }
    }
}

fn default_intro() -> String {
    "According to the knowledge base, ".to_string()
}
fn default_max_summary_chars() -> usize {
    MAX_SUMMARY_CHARS
}

/// Load and validate a TOML configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

impl Config {
    /// Load `path` when it exists, otherwise fall back to defaults so
    /// the CLI works without any configuration file.
    pub fn load_or_default(path: &Path) -> Result<Config> {
        if path.exists() {
            load_config(path)
        } else {
            Ok(Config::default())
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_chars == 0 {
        anyhow::bail!("chunking.chunk_chars must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_chars {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_chars");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if !(0.0..=1.0).contains(&config.qa.min_confidence) {
        anyhow::bail!("qa.min_confidence must be in [0.0, 1.0]");
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai, ollama, or local.",
            other
        ),
    }
    match config.qa.provider.as_str() {
        "disabled" | "hf-inference" => {}
        other => anyhow::bail!(
            "Unknown qa provider: '{}'. Must be disabled or hf-inference.",
            other
        ),
    }
    match config.rerank.provider.as_str() {
        "disabled" | "tei" => {}
        other => anyhow::bail!(
            "Unknown rerank provider: '{}'. Must be disabled or tei.",
            other
        ),
    }

    Ok(())
}
