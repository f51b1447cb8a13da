//! # docqa-rag
//!
//! Question answering over local documents with retrieval-augmented generation.
//!
//! ## Overview
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! vector index that can be persisted to disk. Questions are embedded, the
//! most similar chunks are retrieved, and a generator answers from them.
//!
//! - [`Chunker`] - [`FixedSizeChunker`] and the separator-aware [`BoundaryChunker`]
//! - [`VectorIndex`] - [`InMemoryVectorIndex`], brute-force cosine search with
//!   directory persistence
//! - [`Retriever`] - embed a query, search the index
//! - [`RagPipeline`] - ingest documents and answer questions
//! - [`EmbeddingProvider`], [`Generator`], [`DocumentLoader`] - collaborator
//!   traits, with [`HashEmbedder`], [`FileLoader`] and (feature `ollama`)
//!   `OllamaEmbedder` / `OllamaGenerator`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{InMemoryVectorIndex, ModelConfig, RagConfig, RagPipeline, Services};
//!
//! let services = Services::initialize(&ModelConfig::from_env()).await?;
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(services.embedder())
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .generator(services.generator())
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! println!("{}", pipeline.answer("What is a pod?", 4).await?);
//! ```
//!
//! ## Features
//!
//! - `ollama` (default) - HTTP adapters for a local Ollama server
//! - `pdf` (default) - PDF text extraction in [`FileLoader`]

pub mod chunking;
pub mod config;
mod deadline;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod persist;
pub mod pipeline;
pub mod retriever;
pub mod services;

pub use chunking::{BoundaryChunker, Chunker, FixedSizeChunker, split};
pub use config::{DEFAULT_CONTEXT_DELIMITER, ModelConfig, RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Document, IndexEntry, SearchResult};
pub use embedding::{EmbeddingProvider, HashEmbedder};
pub use error::{RagError, Result};
pub use generation::{Generator, PromptBuilder};
pub use index::{VectorIndex, cosine_similarity};
pub use inmemory::InMemoryVectorIndex;
pub use loader::{DocumentFormat, DocumentLoader, FileLoader, load_dir};
#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use persist::{IndexManifest, read_manifest};
pub use pipeline::{RagPipeline, RagPipelineBuilder, build_context};
pub use retriever::Retriever;
pub use services::Services;
