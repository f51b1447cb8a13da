//! Query-side retrieval: embed the question, search the index.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::deadline::within;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Turns a query string into the `k` most similar indexed chunks.
///
/// Errors from the embedder or the index are returned as-is.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    deadline: Option<Duration>,
}

impl Retriever {
    /// Create a retriever over `index` using `embedder` for queries.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index, deadline: None }
    }

    /// Set the default deadline for the query embedding call.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Return the embedding provider.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Return the vector index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Retrieve the `k` chunks most similar to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.retrieve_within(query, k, self.deadline).await
    }

    /// Retrieve with an explicit deadline on the embedding call.
    pub async fn retrieve_within(
        &self,
        query: &str,
        k: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<SearchResult>> {
        let query_vector = within("query embedding", deadline, self.embedder.embed(query)).await?;
        let results = self.index.search(&query_vector, k).await?;
        debug!(k, result_count = results.len(), "retrieved chunks");
        Ok(results)
    }
}
