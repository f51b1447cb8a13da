//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest-and-answer workflow by
//! composing an [`EmbeddingProvider`], a [`VectorIndex`], a [`Chunker`],
//! and a [`Generator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, InMemoryVectorIndex};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(services.embedder())
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .generator(services.generator())
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! let answer = pipeline.answer("What is a pod?", 4).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::deadline::within;
use crate::document::{Answer, Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::retriever::Retriever;

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → add) and question
/// answering (embed → search → filter → generate). Holds no per-request
/// state. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the retriever used for queries.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        self.retriever.embedder()
    }

    /// Return a reference to the vector index.
    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        self.retriever.index()
    }

    /// Ingest a single document: chunk → embed → add.
    ///
    /// Chunks are embedded in batches of `embed_batch_size`, with up to
    /// `embed_concurrency` batches in flight. All chunks are added to the
    /// index in one call, so a failed ingest leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// Returns the embedder's error, [`RagError::Timeout`] if a batch exceeds
    /// the request deadline, or the index's error from `add`.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        let embedder = self.retriever.embedder();
        let deadline = self.config.request_timeout();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks.chunks(self.config.embed_batch_size))
            .map(|batch| async move {
                let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
                let vectors = within("chunk embedding", deadline, embedder.embed_batch(&texts)).await?;
                if vectors.len() != texts.len() {
                    return Err(RagError::EmbeddingFailure {
                        provider: embedder.model_name().to_string(),
                        message: format!(
                            "expected {} embeddings, received {}",
                            texts.len(),
                            vectors.len()
                        ),
                    });
                }
                Ok::<_, RagError>(vectors)
            })
            .buffered(self.config.embed_concurrency)
            .try_collect()
            .await
            .inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            })?;

        let entries: Vec<(Chunk, Vec<f32>)> =
            chunks.iter().cloned().zip(batches.into_iter().flatten()).collect();
        self.retriever.index().add(entries).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "index add failed during ingestion");
        })?;

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest multiple documents through the chunk → embed → add workflow.
    ///
    /// Returns all chunks that were stored across all documents.
    ///
    /// # Errors
    ///
    /// Stops at the first document that fails; documents before it stay indexed.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for document in documents {
            let chunks = self.ingest(document).await?;
            all_chunks.extend(chunks);
        }
        Ok(all_chunks)
    }

    /// Retrieve the `k` most relevant chunks, filtered by the similarity threshold.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let results = self.retriever.retrieve(query, k).await?;
        Ok(self.apply_threshold(results))
    }

    /// Answer `query` from the `k` most relevant chunks.
    ///
    /// Returns the generator's output unmodified.
    pub async fn answer(&self, query: &str, k: usize) -> Result<String> {
        Ok(self.answer_with_sources(query, k).await?.text)
    }

    /// Answer `query` and return the chunks the answer was conditioned on.
    pub async fn answer_with_sources(&self, query: &str, k: usize) -> Result<Answer> {
        self.answer_within(query, k, self.config.request_timeout()).await
    }

    /// Answer with an explicit deadline applied to each external call.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyIndex`] only when `fail_on_empty_retrieval` is set and
    ///   nothing was retrieved; otherwise the generator runs with an empty context
    /// - [`RagError::Timeout`] if the embedder or generator exceeds `deadline`
    /// - any error from the embedder, index, or generator
    pub async fn answer_within(
        &self,
        query: &str,
        k: usize,
        deadline: Option<Duration>,
    ) -> Result<Answer> {
        let results = match self.retriever.retrieve_within(query, k, deadline).await {
            Ok(results) => self.apply_threshold(results),
            Err(RagError::EmptyIndex) if !self.config.fail_on_empty_retrieval => {
                warn!("index is empty, generating without context");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return Err(e);
            }
        };

        if results.is_empty() && self.config.fail_on_empty_retrieval {
            return Err(RagError::EmptyIndex);
        }

        let context = build_context(&results, &self.config.context_delimiter);
        let text = within("generation", deadline, self.generator.generate(query, &context))
            .await
            .inspect_err(|e| error!(error = %e, "generation failed"))?;

        info!(
            source_count = results.len(),
            answer_len = text.len(),
            model = self.generator.model_name(),
            "answered question"
        );
        Ok(Answer { text, sources: results })
    }

    fn apply_threshold(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let threshold = self.config.similarity_threshold;
        results.into_iter().filter(|r| r.score >= threshold).collect()
    }
}

/// Join chunk texts in result order, separated by `delimiter`.
pub fn build_context(results: &[SearchResult], delimiter: &str) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(delimiter)
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider`, `vector_index` and `generator` are required. The
/// config defaults to [`RagConfig::default`], and the chunker to the one the
/// config describes.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(config)
///     .embedding_provider(Arc::new(embedder))
///     .vector_index(Arc::new(index))
///     .generator(Arc::new(generator))
///     .chunker(Arc::new(BoundaryChunker::new(1000, 200)?))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    generator: Option<Arc<dyn Generator>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the chunker derived from the config.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if a required field is
    /// missing or the config does not validate.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("embedding_provider is required".to_string())
        })?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::InvalidConfiguration("vector_index is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::InvalidConfiguration("generator is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => config.chunker()?,
        };

        let retriever =
            Retriever::new(embedding_provider, vector_index).with_deadline(config.request_timeout());
        Ok(RagPipeline { config, retriever, generator, chunker })
    }
}
