//! # aicmd-embeddings
//!
//! Embedding vectors for the semantic command cache.
//!
//! The cache never talks to an LLM vendor directly. It depends only on the
//! [`EmbeddingProvider`] capability defined here; concrete HTTP providers
//! live in `aicmd-llm` and plug in through that trait.
//!
//! ## Features
//! - [`Embedding`]: fixed-length, unit-normalized `f32` vector
//! - [`EmbeddingProvider`]: async `embed(text)` capability
//! - [`MockEmbedder`]: deterministic offline embedder for tests and dry runs

pub mod error;
pub mod mock;
pub mod model;

pub use error::EmbeddingError;
pub use mock::MockEmbedder;
pub use model::{Embedding, EmbeddingProvider, ModelInfo};
