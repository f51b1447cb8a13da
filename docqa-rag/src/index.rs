//! Vector index trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A store of chunk embeddings with top-k similarity search.
///
/// Any number of searches may run concurrently; [`add`](VectorIndex::add) and
/// [`clear`](VectorIndex::clear) are exclusive, and a concurrent reader sees
/// either the state before or after them, never a partial one.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.add(vec![(chunk, embedding)]).await?;
/// let results = index.search(&query_embedding, 4).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append chunks with their embeddings.
    ///
    /// The first non-empty call establishes the index dimensionality. If any
    /// vector has a different length the whole call fails with
    /// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) and
    /// nothing is added.
    async fn add(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<()>;

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Ties keep insertion order. Fails with
    /// [`RagError::EmptyIndex`](crate::RagError::EmptyIndex) when nothing is
    /// stored.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored entries.
    async fn len(&self) -> usize;

    /// Whether the index holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The established dimensionality, if any entry has been added.
    async fn dimensions(&self) -> Option<usize>;

    /// Remove every entry and forget the dimensionality.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
///
/// Sums are accumulated in `f64` so very large or very small components
/// neither overflow nor underflow. Returns 0.0 if either vector has zero
/// magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut sq_a, mut sq_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        sq_a += x * x;
        sq_b += y * y;
    }
    if sq_a == 0.0 || sq_b == 0.0 {
        return 0.0;
    }
    (dot / (sq_a.sqrt() * sq_b.sqrt())).clamp(-1.0, 1.0) as f32
}
