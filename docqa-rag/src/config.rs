//! Configuration for the RAG pipeline and the model services behind it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::{BoundaryChunker, Chunker, FixedSizeChunker};
use crate::error::{RagError, Result};

/// Default separator placed between retrieved chunks in the context.
pub const DEFAULT_CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Configuration parameters for the RAG pipeline.
///
/// Deserializes from JSON with every field optional, falling back to
/// [`RagConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Cut chunks at paragraph/sentence/word breaks when possible.
    pub boundary_aware: bool,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results (results below this are filtered out).
    pub similarity_threshold: f32,
    /// Separator placed between chunk texts in the generator context.
    pub context_delimiter: String,
    /// Return [`RagError::EmptyIndex`] instead of generating from an empty context.
    pub fail_on_empty_retrieval: bool,
    /// Number of chunk texts sent to the embedder per request.
    pub embed_batch_size: usize,
    /// Number of embedding batches in flight during ingestion.
    pub embed_concurrency: usize,
    /// Deadline in milliseconds for each embedder or generator call; `None` waits forever.
    pub request_timeout_ms: Option<u64>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            boundary_aware: false,
            top_k: 4,
            similarity_threshold: 0.0,
            context_delimiter: DEFAULT_CONTEXT_DELIMITER.to_string(),
            fail_on_empty_retrieval: false,
            embed_batch_size: 16,
            embed_concurrency: 4,
            request_timeout_ms: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Read a JSON configuration file and validate it.
    ///
    /// # Errors
    ///
    /// [`RagError::FileNotFound`] if the file does not exist,
    /// [`RagError::InvalidConfiguration`] if it does not parse or validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RagError::file_not_found(path),
            _ => RagError::Io(e),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            RagError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embed_batch_size == 0` or `embed_concurrency == 0`
    /// - `request_timeout_ms == Some(0)`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidConfiguration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.embed_batch_size == 0 || self.embed_concurrency == 0 {
            return Err(RagError::InvalidConfiguration(
                "embed_batch_size and embed_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(RagError::InvalidConfiguration(
                "request_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// The per-call deadline for external services.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Build the chunker this configuration describes.
    pub fn chunker(&self) -> Result<Arc<dyn Chunker>> {
        if self.boundary_aware {
            Ok(Arc::new(BoundaryChunker::new(self.chunk_size, self.chunk_overlap)?))
        } else {
            Ok(Arc::new(FixedSizeChunker::new(self.chunk_size, self.chunk_overlap)?))
        }
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Cut chunks at natural text boundaries when possible.
    pub fn boundary_aware(mut self, enabled: bool) -> Self {
        self.config.boundary_aware = enabled;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the separator placed between chunks in the generator context.
    pub fn context_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.config.context_delimiter = delimiter.into();
        self
    }

    /// Fail with [`RagError::EmptyIndex`] when retrieval returns nothing.
    pub fn fail_on_empty_retrieval(mut self, enabled: bool) -> Self {
        self.config.fail_on_empty_retrieval = enabled;
        self
    }

    /// Set how many chunks are embedded per request.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set how many embedding requests may run at once during ingestion.
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embed_concurrency = concurrency;
        self
    }

    /// Set the deadline for each embedder or generator call.
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Connection and sampling settings for the Ollama-backed model services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Model used for embeddings.
    pub embed_model: String,
    /// Embedding length, probed from the server when unset.
    pub embed_dimensions: Option<usize>,
    /// Model used for answer generation.
    pub generate_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub max_new_tokens: u32,
    /// Transport timeout for each HTTP request, in seconds.
    pub http_timeout_secs: u64,
    /// Retries after a failed request.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds; doubles on each attempt.
    pub retry_backoff_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "all-minilm".to_string(),
            embed_dimensions: None,
            generate_model: "llama3.2".to_string(),
            temperature: 0.7,
            max_new_tokens: 256,
            http_timeout_secs: 120,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl ModelConfig {
    /// Defaults overridden by `DOCQA_OLLAMA_URL`, `DOCQA_EMBED_MODEL` and
    /// `DOCQA_GENERATE_MODEL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("DOCQA_OLLAMA_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("DOCQA_EMBED_MODEL") {
            config.embed_model = model;
        }
        if let Ok(model) = std::env::var("DOCQA_GENERATE_MODEL") {
            config.generate_model = model;
        }
        config
    }

    /// Set the Ollama base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the generation model.
    pub fn with_generate_model(mut self, model: impl Into<String>) -> Self {
        self.generate_model = model.into();
        self
    }

    /// Declare the embedding length instead of probing for it.
    pub fn with_embed_dimensions(mut self, dimensions: usize) -> Self {
        self.embed_dimensions = Some(dimensions);
        self
    }

    /// Set the retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Transport timeout as a [`Duration`].
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// First retry delay as a [`Duration`].
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_document_chunking_settings() {
        let config = RagConfig::default();
        assert_eq!((config.chunk_size, config.chunk_overlap, config.top_k), (1000, 200, 4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_inconsistent_values() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().embed_concurrency(0).build().is_err());
    }

    #[test]
    fn request_timeout_round_trips_through_builder() {
        let config =
            RagConfig::builder().request_timeout(Some(Duration::from_millis(300))).build().unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(300)));
        assert!(RagConfig::builder().request_timeout(Some(Duration::ZERO)).build().is_err());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("docqa.json");
        std::fs::write(&path, r#"{ "chunk_size": 500, "chunk_overlap": 50, "top_k": 6 }"#).unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.top_k, 6);
        assert_eq!(config.context_delimiter, DEFAULT_CONTEXT_DELIMITER);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("docqa.json");
        std::fs::write(&path, r#"{ "chunk_size": 100, "chunk_overlap": 150 }"#).unwrap();
        assert!(matches!(RagConfig::from_file(&path), Err(RagError::InvalidConfiguration(_))));
        assert!(matches!(
            RagConfig::from_file(temp.path().join("missing.json")),
            Err(RagError::FileNotFound { .. })
        ));
    }

    #[test]
    fn boundary_flag_selects_chunker() {
        let config = RagConfig::builder().chunk_size(50).chunk_overlap(10).boundary_aware(true);
        let chunker = config.build().unwrap().chunker().unwrap();
        assert_eq!((chunker.chunk_size(), chunker.chunk_overlap()), (50, 10));
    }
}
