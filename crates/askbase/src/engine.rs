//! Engine orchestrator: two-phase lifecycle and the query pipeline.
//!
//! An [`Engine`] is constructed, initialized once (usually on a
//! background task via [`Engine::spawn_initialize`]), and then serves
//! read-only queries. Readiness is published through a single atomic
//! flag written with release semantics after the engine state is stored,
//! so concurrent callers never observe a partially built state.
//!
//! `query` never returns an error: a not-ready engine, an empty corpus,
//! or any pipeline failure all produce a well-formed system-source
//! [`Answer`].
//!
//! # Pipeline
//!
//! ```text
//! initialize: load docs → chunk → fingerprint → cache dir →
//!             embedder (fatal on failure) → cache load-or-encode+save →
//!             QA scorer (optional) → reranker (optional) → Ready
//! query:      encode question → similarity shortlist (pre_k) →
//!             rerank to top_k (degrades gracefully) →
//!             QA span with confidence gate → extractive fallback
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use askbase_core::chunk::chunk_documents;
use askbase_core::embedding::Embedder;
use askbase_core::error::StageError;
use askbase_core::extract;
use askbase_core::fingerprint::fingerprint;
use askbase_core::models::{Answer, Chunk};
use askbase_core::retrieval;
use askbase_core::scorer::{AnswerScorer, PairScorer};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::corpus;
use crate::{embedding, qa, rerank};

/// Served while initialization has not completed (or failed).
pub const NOT_READY_MESSAGE: &str =
    "The answer engine is still starting up. Please try again in a moment.";

/// Served when the knowledge base produced zero chunks.
pub const EMPTY_CORPUS_MESSAGE: &str = "No content is available in the knowledge base.";

/// Served when a query fails inside the pipeline.
pub const QUERY_FAILED_MESSAGE: &str =
    "Something went wrong while answering. Please try again.";

/// The scoring collaborators, bundled so tests and embedders can be
/// injected without touching provider configuration.
pub struct Models {
    pub embedder: Box<dyn Embedder>,
    pub qa: Option<Box<dyn AnswerScorer>>,
    pub reranker: Option<Box<dyn PairScorer>>,
}

impl Models {
    /// Build providers from configuration. The embedder is required;
    /// QA and reranker failures degrade to absent with a warning.
    pub fn from_config(config: &Config) -> Result<Self, StageError> {
        let embedder = embedding::create_embedder(&config.embedding)?;

        let qa = match qa::create_answer_scorer(&config.qa) {
            Ok(scorer) => scorer,
            Err(e) => {
                warn!(error = %e, "QA scorer unavailable, continuing without focused extraction");
                None
            }
        };
        let reranker = match rerank::create_pair_scorer(&config.rerank) {
            Ok(scorer) => scorer,
            Err(e) => {
                warn!(error = %e, "reranker unavailable, continuing without reranking");
                None
            }
        };

        Ok(Self {
            embedder,
            qa,
            reranker,
        })
    }
}

/// Everything a query needs, built once during initialization and
/// immutable afterwards.
struct EngineState {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    models: Models,
}

/// Retrieval-augmented answer engine over a local text corpus.
pub struct Engine {
    config: Config,
    /// Models injected at construction, consumed by `initialize`.
    /// Empty means "build from config".
    injected: Mutex<Option<Models>>,
    state: RwLock<Option<EngineState>>,
    initialized: AtomicBool,
}

impl Engine {
    /// Create an engine whose models are built from the configuration
    /// during [`initialize`](Engine::initialize).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            injected: Mutex::new(None),
            state: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Create an engine with pre-built scoring models (dependency
    /// injection; also the seam used by tests).
    pub fn with_models(config: Config, models: Models) -> Self {
        Self {
            config,
            injected: Mutex::new(Some(models)),
            state: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether the engine is ready to serve model-backed answers.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Number of indexed chunks, once initialized.
    pub async fn chunk_count(&self) -> usize {
        self.state
            .read()
            .await
            .as_ref()
            .map_or(0, |s| s.chunks.len())
    }

    /// Run the full initialization sequence.
    ///
    /// Idempotent per instance: a second call on a ready engine is a
    /// no-op. Any failure leaves the engine not-initialized; there is no
    /// in-place retry — construct a new engine instead.
    ///
    /// Only an embedding-model failure can surface here; every other
    /// stage degrades locally.
    pub async fn initialize(&self) -> Result<(), StageError> {
        if self.is_initialized() {
            return Ok(());
        }

        match self.build_state().await {
            Ok(state) => {
                info!(chunks = state.chunks.len(), "initialization complete");
                *self.state.write().await = Some(state);
                self.initialized.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                self.initialized.store(false, Ordering::Release);
                error!(error = %e, "initialization failed");
                Err(e)
            }
        }
    }

    /// Initialize on a background task so the caller stays responsive;
    /// readiness is observable through [`is_initialized`](Engine::is_initialized).
    pub fn spawn_initialize(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are logged inside initialize.
            let _ = engine.initialize().await;
        })
    }

    async fn build_state(&self) -> Result<EngineState, StageError> {
        let config = &self.config;

        info!(dir = %config.corpus.dir.display(), "loading documents");
        let documents = corpus::load_documents(&config.corpus.dir);
        let chunks = chunk_documents(
            &documents,
            config.chunking.chunk_chars,
            config.chunking.chunk_overlap,
        );
        info!(documents = documents.len(), chunks = chunks.len(), "corpus chunked");

        let stats = corpus::corpus_stats(&config.corpus.dir);
        let corpus_fingerprint = fingerprint(
            &config.embedding.model,
            config.chunking.chunk_chars,
            config.chunking.chunk_overlap,
            &stats,
        );
        let cache = CacheStore::new(&config.cache.dir);
        cache.ensure_dir();

        let models = match self.injected.lock().await.take() {
            Some(models) => models,
            None => Models::from_config(config)?,
        };

        let (chunks, embeddings) = match cache.load(&corpus_fingerprint, chunks.len()) {
            Some((cached_chunks, embeddings)) => {
                info!(
                    chunks = cached_chunks.len(),
                    fingerprint = %corpus_fingerprint,
                    "loaded embeddings from cache"
                );
                (cached_chunks, embeddings)
            }
            None => {
                info!(
                    chunks = chunks.len(),
                    model = models.embedder.model_name(),
                    "encoding chunks"
                );
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let embeddings = if texts.is_empty() {
                    Vec::new()
                } else {
                    models
                        .embedder
                        .encode(&texts, true, config.embedding.batch_size)
                        .await?
                };
                cache.save(&corpus_fingerprint, &chunks, &embeddings);
                (chunks, embeddings)
            }
        };

        Ok(EngineState {
            chunks,
            embeddings,
            models,
        })
    }

    /// Answer a question.
    ///
    /// Never fails: every outcome is a well-formed [`Answer`], with
    /// system-source messages for not-ready, empty-corpus, and pipeline
    /// failure cases.
    pub async fn query(&self, question: &str) -> Answer {
        if !self.is_initialized() {
            return Answer::system(NOT_READY_MESSAGE);
        }

        let guard = self.state.read().await;
        let Some(state) = guard.as_ref() else {
            return Answer::system(NOT_READY_MESSAGE);
        };
        if state.chunks.is_empty() {
            return Answer::system(EMPTY_CORPUS_MESSAGE);
        }

        match answer_query(&self.config, state, question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(question, error = %e, "query failed");
                Answer::system(QUERY_FAILED_MESSAGE)
            }
        }
    }
}

/// The retrieve → rerank → extract pipeline for one question.
async fn answer_query(
    config: &Config,
    state: &EngineState,
    question: &str,
) -> Result<Answer, StageError> {
    let encoded = state
        .models
        .embedder
        .encode(&[question.to_string()], true, 1)
        .await?;
    let query_vec = encoded
        .into_iter()
        .next()
        .ok_or_else(|| StageError::Embedding("empty embedding response".to_string()))?;

    let pre_k = config.retrieval.effective_pre_k();
    let shortlist = retrieval::rank(&state.embeddings, &query_vec, pre_k);
    let pre_chunks: Vec<&Chunk> = shortlist.iter().map(|&(i, _)| &state.chunks[i]).collect();

    let top_chunks = select_top_chunks(config, state, question, &pre_chunks).await;
    let source = extract::source_list(&top_chunks);

    if let Some(qa_scorer) = &state.models.qa {
        let context: String = top_chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        match qa_scorer.answer(question, &context).await {
            Ok(span) => {
                let candidate = span.answer.trim();
                if !candidate.is_empty() && span.score >= config.qa.min_confidence {
                    if candidate.chars().count() < config.qa.min_direct_chars {
                        // Too terse to stand alone — use it to seed the
                        // sentence summary instead.
                        let enriched = extract::build_answer(
                            question,
                            &top_chunks,
                            Some(candidate),
                            &config.answer.intro,
                            config.answer.max_summary_chars,
                        );
                        return Ok(Answer {
                            answer: enriched,
                            source,
                        });
                    }
                    return Ok(Answer {
                        answer: candidate.to_string(),
                        source,
                    });
                }
                debug!(score = span.score, "QA span rejected by confidence gate");
            }
            Err(e) => {
                warn!(error = %e, "QA extraction failed, falling back to sentence summary");
            }
        }
    }

    let answer = extract::build_answer(
        question,
        &top_chunks,
        None,
        &config.answer.intro,
        config.answer.max_summary_chars,
    );
    Ok(Answer { answer, source })
}

/// Narrow the similarity shortlist to `top_k`, reranked when a pair
/// scorer is available. Reranking never aborts the query: any failure
/// keeps the shortlist in retrieval order.
async fn select_top_chunks<'a>(
    config: &Config,
    state: &EngineState,
    question: &str,
    pre_chunks: &[&'a Chunk],
) -> Vec<&'a Chunk> {
    let top_k = config.retrieval.top_k;

    if let Some(reranker) = &state.models.reranker {
        let texts: Vec<String> = pre_chunks.iter().map(|c| c.text.clone()).collect();
        match reranker.score(question, &texts).await {
            Ok(scores) if scores.len() == texts.len() => {
                return retrieval::stable_desc_order(&scores)
                    .into_iter()
                    .take(top_k)
                    .map(|i| pre_chunks[i])
                    .collect();
            }
            Ok(scores) => {
                warn!(
                    got = scores.len(),
                    expected = texts.len(),
                    "reranker returned wrong score count, keeping retrieval order"
                );
            }
            Err(e) => {
                warn!(error = %e, "reranking failed, keeping retrieval order");
            }
        }
    }

    pre_chunks.iter().take(top_k).copied().collect()
}
