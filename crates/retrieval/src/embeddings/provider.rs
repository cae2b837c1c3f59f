//! Embedding provider trait and factory.

use lectern_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// An embedding provider maps text to a fixed-length vector. The same
/// provider must be used at index time and at query time; mixing vector
/// spaces silently degrades every search.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }
}

/// Create an embedding provider by name.
///
/// # Arguments
/// * `provider` - Provider identifier ("trigram" or "ollama")
/// * `model` - Model identifier (ignored by "trigram")
/// * `endpoint` - Provider endpoint URL (ignored by "trigram")
/// * `dimensions` - Embedding vector dimension
pub fn create_provider(
    provider: &str,
    model: &str,
    endpoint: &str,
    dimensions: usize,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match provider {
        "trigram" => Ok(Arc::new(super::providers::trigram::TrigramProvider::new(
            dimensions,
        ))),

        "ollama" => Ok(Arc::new(super::providers::ollama::OllamaEmbeddings::new(
            endpoint, model, dimensions,
        ))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider("trigram", "", "", 384).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider() {
        let provider =
            create_provider("ollama", "nomic-embed-text", "http://localhost:11434", 768).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider("unknown", "", "", 384);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider("trigram", "", "", 384).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
