//! # askbase-core
//!
//! Shared, I/O-free logic for askbase: data models, document chunking,
//! corpus fingerprinting, retrieval math, answer extraction, and the
//! scoring-provider traits.
//!
//! This crate contains no tokio runtime, HTTP, or filesystem access.
//! Concrete embedding/QA/reranker providers, the cache store, and the
//! engine orchestrator live in the `askbase` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod models;
pub mod retrieval;
pub mod scorer;
