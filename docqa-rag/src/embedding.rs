//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Ollama, a local hashing
/// scheme, test doubles) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Identical input must produce identical output for a given model.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let provider = HashEmbedder::new(256)?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding for better throughput.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Identifier of the embedding model, recorded in persisted indexes.
    fn model_name(&self) -> &str;
}

/// An offline embedder that hashes word tokens into a fixed number of buckets.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) to a bucket and a
/// sign; the resulting bag-of-words vector is L2-normalized. Texts that share
/// vocabulary get high cosine similarity, which is enough for keyword-style
/// retrieval without a model server.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    model_name: String,
}

impl HashEmbedder {
    /// Create a hashing embedder producing `dimensions`-long vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding dimensions must be greater than zero".into(),
            ));
        }
        Ok(Self { dimensions, model_name: format!("hash-bow-{dimensions}") })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[tokio::test]
    async fn hash_embedder_is_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64).unwrap();
        let a = embedder.embed("Kubernetes pods and nodes").await.unwrap();
        let b = embedder.embed("Kubernetes pods and nodes").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new(256).unwrap();
        let query = embedder.embed("how are pods scheduled").await.unwrap();
        let related = embedder.embed("The scheduler assigns pods to nodes").await.unwrap();
        let unrelated = embedder.embed("Bread needs flour and yeast").await.unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn text_without_tokens_is_the_zero_vector() {
        let embedder = HashEmbedder::new(8).unwrap();
        assert_eq!(embedder.embed(" ... ").await.unwrap(), vec![0.0; 8]);
    }

    #[test]
    fn zero_dimensions_is_rejected() {
        assert!(matches!(HashEmbedder::new(0), Err(RagError::InvalidConfiguration(_))));
    }
}
