//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a brute-force index backed by
//! an insertion-ordered `Vec` protected by a `tokio::sync::RwLock`. A linear
//! scan is plenty for the few thousand chunks a single document produces.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, IndexEntry, SearchResult};
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, cosine_similarity};

/// An in-memory vector index using cosine similarity for search.
///
/// Searches share a read lock; [`add`](VectorIndex::add),
/// [`clear`](VectorIndex::clear) and [`persist`](InMemoryVectorIndex::persist)
/// take the write lock.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::with_model("all-minilm");
/// index.add(entries).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    pub(crate) state: RwLock<IndexState>,
}

#[derive(Debug, Default)]
pub(crate) struct IndexState {
    pub(crate) entries: Vec<IndexEntry>,
    pub(crate) dimensions: Option<usize>,
    pub(crate) embedding_model: String,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory vector index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index that records which embedding model fills it.
    pub fn with_model(embedding_model: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(IndexState {
                embedding_model: embedding_model.into(),
                ..IndexState::default()
            }),
        }
    }

    /// The embedding model identifier recorded for this index.
    pub async fn embedding_model(&self) -> String {
        self.state.read().await.embedding_model.clone()
    }

    /// A copy of every stored entry in insertion order.
    pub async fn entries(&self) -> Vec<IndexEntry> {
        self.state.read().await.entries.clone()
    }

    pub(crate) fn from_state(state: IndexState) -> Self {
        Self { state: RwLock::new(state) }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let expected = match state.dimensions {
            Some(dimensions) => dimensions,
            None => entries[0].1.len(),
        };
        if expected == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding vectors must not be empty".into(),
            ));
        }
        if let Some((_, vector)) = entries.iter().find(|(_, vector)| vector.len() != expected) {
            return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
        }
        if let Some((chunk, _)) =
            entries.iter().find(|(_, vector)| vector.iter().any(|x| !x.is_finite()))
        {
            return Err(RagError::InvalidConfiguration(format!(
                "embedding for chunk {} has non-finite components",
                chunk.id
            )));
        }

        let added = entries.len();
        state.dimensions = Some(expected);
        state.entries.extend(entries.into_iter().map(|(chunk, vector)| IndexEntry {
            id: chunk.id.clone(),
            chunk,
            vector,
        }));

        debug!(added, total = state.entries.len(), dimensions = expected, "added index entries");
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidConfiguration("k must be greater than zero".into()));
        }

        let state = self.state.read().await;
        if state.entries.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        if let Some(expected) = state.dimensions {
            if query.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: query.len() });
            }
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(RagError::InvalidConfiguration(
                "query embedding has non-finite components".into(),
            ));
        }

        let mut scored: Vec<SearchResult> = state
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.vector, query),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let removed = state.entries.len();
        state.entries.clear();
        state.dimensions = None;
        info!(removed, "cleared vector index");
        Ok(())
    }
}
