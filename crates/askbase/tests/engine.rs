//! End-to-end engine scenarios with stub scoring providers.
//!
//! The stubs implement the core scorer traits directly, so the full
//! initialize/query lifecycle runs without any model service: a
//! deterministic bag-of-words embedder, QA scorers with fixed spans and
//! confidences, and a reranker that always fails.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use askbase::config::Config;
use askbase::engine::{Engine, Models, EMPTY_CORPUS_MESSAGE, NOT_READY_MESSAGE};
use askbase_core::embedding::{normalize, Embedder};
use askbase_core::error::StageError;
use askbase_core::models::SYSTEM_SOURCE;
use askbase_core::scorer::{AnswerScorer, PairScorer, SpanAnswer};

const DIM: usize = 64;

/// Deterministic bag-of-words embedding: tokens hashed into a fixed
/// number of buckets, then L2-normalized. Shared tokens between a
/// question and a chunk produce positive similarity.
fn bag_of_words(text: &str, normalize_flag: bool) -> Vec<f32> {
    let mut vec = vec![0.0f32; DIM];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let h = token
            .bytes()
            .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64));
        vec[(h % DIM as u64) as usize] += 1.0;
    }
    if normalize_flag {
        normalize(&mut vec);
    }
    vec
}

struct StubEmbedder {
    calls: Arc<AtomicUsize>,
}

impl StubEmbedder {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn counted(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_name(&self) -> &str {
        "stub-bag-of-words"
    }

    async fn encode(
        &self,
        texts: &[String],
        normalize_vectors: bool,
        _batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| bag_of_words(t, normalize_vectors))
            .collect())
    }
}

struct FixedQa {
    answer: String,
    score: f32,
}

#[async_trait]
impl AnswerScorer for FixedQa {
    fn model_name(&self) -> &str {
        "stub-qa"
    }

    async fn answer(&self, _question: &str, _context: &str) -> Result<SpanAnswer, StageError> {
        Ok(SpanAnswer {
            answer: self.answer.clone(),
            score: self.score,
        })
    }
}

struct FailingReranker;

#[async_trait]
impl PairScorer for FailingReranker {
    fn model_name(&self) -> &str {
        "stub-reranker"
    }

    async fn score(&self, _question: &str, _texts: &[String]) -> Result<Vec<f32>, StageError> {
        Err(StageError::Rerank("scorer crashed".to_string()))
    }
}

fn test_config(kb: &TempDir, cache: &TempDir) -> Config {
    let mut config = Config::default();
    config.corpus.dir = kb.path().to_path_buf();
    config.cache.dir = cache.path().to_path_buf();
    config
}

fn models(embedder: StubEmbedder) -> Models {
    Models {
        embedder: Box::new(embedder),
        qa: None,
        reranker: None,
    }
}

const FARMACIA: &str =
    "O programa oferece medicamentos gratuitos para hipertensão e diabetes.";

#[tokio::test]
async fn farmacia_fallback_answer_cites_source() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("farmacia.txt"), FARMACIA).unwrap();

    let engine = Engine::with_models(test_config(&kb, &cache), models(StubEmbedder::new()));
    engine.initialize().await.unwrap();
    assert!(engine.is_initialized());
    assert_eq!(engine.chunk_count().await, 1);

    let answer = engine.query("quais medicamentos gratuitos").await;
    assert!(answer.answer.contains("medicamentos"));
    assert_eq!(answer.source, "farmacia.txt");
    assert!(answer.answer.starts_with("According to the knowledge base, "));
}

#[tokio::test]
async fn empty_corpus_answers_without_model_calls() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Engine::with_models(
        test_config(&kb, &cache),
        models(StubEmbedder::counted(Arc::clone(&calls))),
    );
    engine.initialize().await.unwrap();
    assert!(engine.is_initialized());
    assert_eq!(engine.chunk_count().await, 0);

    let answer = engine.query("qualquer pergunta").await;
    assert_eq!(answer.answer, EMPTY_CORPUS_MESSAGE);
    assert_eq!(answer.source, SYSTEM_SOURCE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn query_before_ready_is_apology() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("a.txt"), "Conteúdo qualquer.").unwrap();

    let engine = Engine::with_models(test_config(&kb, &cache), models(StubEmbedder::new()));
    let answer = engine.query("pergunta").await;
    assert_eq!(answer.answer, NOT_READY_MESSAGE);
    assert_eq!(answer.source, SYSTEM_SOURCE);
}

#[tokio::test]
async fn failing_reranker_degrades_to_retrieval_order() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(
        kb.path().join("medicamentos.txt"),
        "O programa oferece medicamentos gratuitos.\nA retirada exige receita médica.",
    )
    .unwrap();
    fs::write(
        kb.path().join("horarios.txt"),
        "As farmácias funcionam das 8h às 18h.",
    )
    .unwrap();

    let engine = Engine::with_models(
        test_config(&kb, &cache),
        Models {
            embedder: Box::new(StubEmbedder::new()),
            qa: None,
            reranker: Some(Box::new(FailingReranker)),
        },
    );
    engine.initialize().await.unwrap();

    let answer = engine.query("quais medicamentos gratuitos").await;
    // Well-formed despite every rerank call failing.
    assert!(!answer.answer.is_empty());
    assert_ne!(answer.source, SYSTEM_SOURCE);
    assert!(answer.answer.contains("medicamentos"));
}

#[tokio::test]
async fn low_confidence_span_is_never_returned_verbatim() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("farmacia.txt"), FARMACIA).unwrap();

    let span = "hipertensão e diabetes";
    let engine = Engine::with_models(
        test_config(&kb, &cache),
        Models {
            embedder: Box::new(StubEmbedder::new()),
            qa: Some(Box::new(FixedQa {
                answer: span.to_string(),
                score: 0.10,
            })),
            reranker: None,
        },
    );
    engine.initialize().await.unwrap();

    let answer = engine.query("quais medicamentos gratuitos").await;
    assert_ne!(answer.answer, span);
    // Gate rejected the span, so the fallback runs unseeded.
    assert!(answer.answer.starts_with("According to the knowledge base, "));
    assert!(answer.answer.contains("medicamentos"));
}

#[tokio::test]
async fn short_confident_span_is_enriched_not_verbatim() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("farmacia.txt"), FARMACIA).unwrap();

    let engine = Engine::with_models(
        test_config(&kb, &cache),
        Models {
            embedder: Box::new(StubEmbedder::new()),
            qa: Some(Box::new(FixedQa {
                answer: "Sim".to_string(),
                score: 0.9,
            })),
            reranker: None,
        },
    );
    engine.initialize().await.unwrap();

    let answer = engine.query("quais medicamentos gratuitos").await;
    assert!(answer.answer.starts_with("Sim: "));
    assert!(answer.answer.contains("medicamentos"));
}

#[tokio::test]
async fn long_confident_span_is_returned_verbatim() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("farmacia.txt"), FARMACIA).unwrap();

    let span = "O programa oferece medicamentos gratuitos para hipertensão e diabetes";
    let engine = Engine::with_models(
        test_config(&kb, &cache),
        Models {
            embedder: Box::new(StubEmbedder::new()),
            qa: Some(Box::new(FixedQa {
                answer: span.to_string(),
                score: 0.8,
            })),
            reranker: None,
        },
    );
    engine.initialize().await.unwrap();

    let answer = engine.query("o que o programa oferece").await;
    assert_eq!(answer.answer, span);
    assert_eq!(answer.source, "farmacia.txt");
}

#[tokio::test]
async fn second_engine_reuses_cache_without_encoding() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("farmacia.txt"), FARMACIA).unwrap();

    let first = Engine::with_models(test_config(&kb, &cache), models(StubEmbedder::new()));
    first.initialize().await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let second = Engine::with_models(
        test_config(&kb, &cache),
        models(StubEmbedder::counted(Arc::clone(&calls))),
    );
    second.initialize().await.unwrap();
    assert_eq!(second.chunk_count().await, 1);
    // Same fingerprint: embeddings came from the cache, not the model.
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // And the cached chunks still answer.
    let answer = second.query("quais medicamentos gratuitos").await;
    assert_eq!(answer.source, "farmacia.txt");
}

#[tokio::test]
async fn background_initialization_publishes_readiness() {
    let kb = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(kb.path().join("farmacia.txt"), FARMACIA).unwrap();

    let engine = Arc::new(Engine::with_models(
        test_config(&kb, &cache),
        models(StubEmbedder::new()),
    ));
    let handle = engine.spawn_initialize();
    handle.await.unwrap();

    assert!(engine.is_initialized());
    let answer = engine.query("medicamentos").await;
    assert_eq!(answer.source, "farmacia.txt");
}
