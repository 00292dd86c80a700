//! # askbase
//!
//! Retrieval-augmented question answering over a small, local,
//! plain-text knowledge base.
//!
//! The pipeline: documents are chunked on paragraph boundaries, encoded
//! into unit-normalized embeddings (cached on disk, keyed by a corpus
//! fingerprint), retrieved by dot-product similarity, optionally
//! reranked by a cross-encoder, and answered either with a
//! confidence-gated QA span or an extractive sentence summary.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌─────────────────┐
//! │ *.txt files │──▶│ Chunk + Embed │──▶│ cache/<fp>.{json,bin} │
//! └────────────┘   └──────────────┘   └────────┬────────┘
//!                                              │
//!                              ┌───────────────▼───────────────┐
//!                              │ retrieve → rerank → extract   │
//!                              │        Engine::query          │
//!                              └───────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration surface |
//! | [`corpus`] | Knowledge-base file loading |
//! | [`cache`] | Fingerprint-keyed chunk/embedding cache |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama, local) |
//! | [`qa`] | Optional QA span-extraction provider |
//! | [`rerank`] | Optional cross-encoder rerank provider |
//! | [`engine`] | Orchestrator: lifecycle and query pipeline |

pub mod cache;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod qa;
pub mod rerank;
