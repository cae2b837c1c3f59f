//! Embedding providers for course content.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
