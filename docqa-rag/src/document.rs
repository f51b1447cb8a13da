//! Data types for documents, chunks, index entries, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing extracted text and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source identifier, usually the path the document was loaded from.
    pub id: String,
    /// The extracted text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Length of the text in characters, the unit chunk offsets are measured in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A contiguous span of a [`Document`]'s text.
///
/// Offsets count `char`s, not bytes, so they stay meaningful for non-ASCII
/// text extracted from PDFs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier, `{source_id}_{sequence_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The [`Document::id`] this chunk was cut from.
    pub source_id: String,
    /// First character of the chunk in the source text.
    pub start_offset: usize,
    /// One past the last character of the chunk in the source text.
    pub end_offset: usize,
    /// Position among the chunks of the same document.
    pub sequence_index: usize,
    /// Metadata inherited from the parent document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Number of characters the chunk spans.
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// A [`Chunk`] stored in a vector index together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// Opaque identifier of the entry.
    pub id: String,
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The chunk's embedding vector.
    pub vector: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// A generated answer and the chunks it was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The generator's output, unmodified.
    pub text: String,
    /// Retrieved chunks in the order they appeared in the context.
    pub sources: Vec<SearchResult>,
}
