//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] cuts a sliding window at fixed character offsets
//! - [`BoundaryChunker`] uses the same window, but pulls each cut back to the nearest
//!   paragraph, line, sentence, or word break inside a small lookback window
//!
//! Both strategies share one window walk, so they share its guarantees: every
//! chunk spans at most `chunk_size` characters, consecutive chunks overlap by
//! exactly `chunk_overlap` characters, the last chunk ends at the end of the
//! text, and no chunk is empty.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators tried by [`BoundaryChunker`], most preferred first.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Maximum number of characters per chunk.
    fn chunk_size(&self) -> usize;

    /// Number of characters shared by consecutive chunks.
    fn chunk_overlap(&self) -> usize;
}

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration("chunk_size must be greater than zero".into()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{sequence_index}`. Each chunk
/// inherits the parent document's metadata.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let spans = window_spans(&document.text, self.chunk_size, self.chunk_overlap, 0);
        build_chunks(document, spans)
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

/// Splits text with the fixed-size window, but prefers to cut at natural breaks.
///
/// When a window would end mid-text, the chunker looks back up to `lookback`
/// characters from the naive cut for a paragraph break (`\n\n`), then a line
/// break, then a sentence end (`. `, `! `, `? `), then a space, and cuts just
/// after the first separator kind it finds. If no separator lies far enough
/// into the window to keep the next chunk moving forward, the naive cut is
/// used.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::BoundaryChunker;
///
/// let chunker = BoundaryChunker::new(1000, 200)?.with_lookback(150);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    lookback: usize,
}

impl BoundaryChunker {
    /// Create a new `BoundaryChunker` with a lookback of a quarter chunk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap, lookback: chunk_size / 4 })
    }

    /// Set how many characters before the naive cut are searched for a separator.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }
}

impl Chunker for BoundaryChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let spans =
            window_spans(&document.text, self.chunk_size, self.chunk_overlap, self.lookback);
        build_chunks(document, spans)
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

/// Split raw text into chunks with the fixed-size strategy.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] for a zero `chunk_size` or an
/// overlap that is not smaller than `chunk_size`; no chunks are produced.
pub fn split(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let chunker = FixedSizeChunker::new(chunk_size, chunk_overlap)?;
    Ok(chunker.chunk(&Document::new(source_id, text)))
}

/// Byte offset of every `char` boundary in `text`, including `text.len()`.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

/// Walk the text and return `(start, end)` character spans.
///
/// `chunk_size > chunk_overlap` must already hold. A `lookback` of zero
/// disables separator search.
fn window_spans(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    lookback: usize,
) -> Vec<(usize, usize)> {
    let bounds = char_boundaries(text);
    let total = bounds.len() - 1;
    let mut spans = Vec::new();
    if total == 0 {
        return spans;
    }

    let mut start = 0;
    loop {
        let mut end = (start + chunk_size).min(total);
        if end < total && lookback > 0 {
            if let Some(cut) = find_cut(text, &bounds, start, end, chunk_overlap, lookback) {
                end = cut;
            }
        }

        spans.push((start, end));
        if end >= total {
            break;
        }
        // end > start + overlap, so the window always advances.
        start = end - chunk_overlap;
    }

    spans
}

/// Find a separator-aligned cut in `(start + overlap, end]`, searching at most
/// `lookback` characters back from `end`.
fn find_cut(
    text: &str,
    bounds: &[usize],
    start: usize,
    end: usize,
    chunk_overlap: usize,
    lookback: usize,
) -> Option<usize> {
    let floor = end.saturating_sub(lookback).max(start + chunk_overlap + 1);
    if floor >= end {
        return None;
    }

    let base = bounds[floor];
    let window = &text[base..bounds[end]];
    SEPARATORS.iter().find_map(|separator| {
        let pos = window.rfind(separator)?;
        bounds.binary_search(&(base + pos + separator.len())).ok()
    })
}

fn build_chunks(document: &Document, spans: Vec<(usize, usize)>) -> Vec<Chunk> {
    if spans.is_empty() {
        return Vec::new();
    }

    let bounds = char_boundaries(&document.text);
    spans
        .into_iter()
        .enumerate()
        .map(|(sequence_index, (start, end))| Chunk {
            id: format!("{}_{sequence_index}", document.id),
            text: document.text[bounds[start]..bounds[end]].to_string(),
            source_id: document.id.clone(),
            start_offset: start,
            end_offset: end,
            sequence_index,
            metadata: document.metadata.clone(),
        })
        .collect()
}
