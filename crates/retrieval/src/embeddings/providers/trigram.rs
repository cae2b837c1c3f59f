//! Deterministic character-trigram embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use lectern_core::AppResult;

/// Trigram-based embedding provider for local, offline operation.
///
/// Hashes word and character-trigram features into a fixed-size vector.
/// Not semantically accurate like a neural model, but deterministic and
/// content-dependent, so vocabulary overlap produces positive cosine
/// similarity. Suitable for tests and offline use.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Lowercase and strip punctuation so "MCP:" and "mcp" produce the same
    /// token stream.
    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 2)
            .map(|w| w.to_string())
            .collect()
    }

    fn hash_feature(feature: &str, seed: u64) -> u64 {
        feature
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(131).wrapping_add(b as u64))
    }

    /// Add a hashed feature with a hash-derived sign. Signed buckets keep
    /// the expected dot product of texts with disjoint vocabulary at zero,
    /// so bucket collisions do not read as similarity.
    fn add_feature(&self, embedding: &mut [f32], feature: &str, seed: u64, weight: f32) {
        let hash = Self::hash_feature(feature, seed);
        let dim = (hash as usize) % self.dimensions;
        let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        embedding[dim] += sign * weight;
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let mut frequencies = std::collections::HashMap::new();
        for token in Self::tokenize(text) {
            *frequencies.entry(token).or_insert(0u32) += 1;
        }

        for (token, count) in &frequencies {
            let weight = (*count as f32).sqrt();

            // Whole-word feature
            self.add_feature(&mut embedding, token, 7, weight);

            // Character trigram features
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut embedding, &trigram, 13, weight);
            }
        }

        // Normalize to unit length so cosine similarity is a dot product
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
