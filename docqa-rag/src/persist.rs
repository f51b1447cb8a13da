//! On-disk format for [`InMemoryVectorIndex`].
//!
//! An index directory holds two files:
//!
//! - `manifest.json` holds the [`IndexManifest`] (format version, dimensionality,
//!   embedding model, entry count)
//! - `entries.jsonl` holds one JSON [`IndexEntry`] per line
//!
//! Both are written to a temporary name and renamed into place, entries
//! first, so a directory with a manifest always has a complete entry file.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::IndexEntry;
use crate::error::{RagError, Result};
use crate::inmemory::{InMemoryVectorIndex, IndexState};

/// Manifest file name inside an index directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Entry file name inside an index directory.
pub const ENTRIES_FILE: &str = "entries.jsonl";

/// The only on-disk layout this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Description of a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// Layout version, currently [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Length of every stored vector.
    pub dimensions: usize,
    /// Identifier of the embedding model that produced the vectors.
    pub embedding_model: String,
    /// Number of lines in the entry file.
    pub entry_count: usize,
    /// When the index was written.
    pub created_at: DateTime<Utc>,
}

impl InMemoryVectorIndex {
    /// Write the index to `dir`, creating the directory if needed.
    ///
    /// Holds the write lock for the duration, so no entry can be added while
    /// the snapshot is taken.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyIndex`] if there is nothing to persist, or
    /// [`RagError::Io`] if writing fails.
    pub async fn persist(&self, dir: impl AsRef<Path>) -> Result<IndexManifest> {
        let dir = dir.as_ref();
        let state = self.state.write().await;
        let dimensions = match state.dimensions {
            Some(dimensions) if !state.entries.is_empty() => dimensions,
            _ => return Err(RagError::EmptyIndex),
        };

        tokio::fs::create_dir_all(dir).await?;

        let mut lines = String::new();
        for entry in &state.entries {
            let line = serde_json::to_string(entry).map_err(|e| {
                RagError::Io(std::io::Error::other(format!("failed to serialize entry: {e}")))
            })?;
            lines.push_str(&line);
            lines.push('\n');
        }
        write_atomically(&dir.join(ENTRIES_FILE), lines.as_bytes()).await?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            dimensions,
            embedding_model: state.embedding_model.clone(),
            entry_count: state.entries.len(),
            created_at: Utc::now(),
        };
        let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            RagError::Io(std::io::Error::other(format!("failed to serialize manifest: {e}")))
        })?;
        write_atomically(&dir.join(MANIFEST_FILE), manifest_json.as_bytes()).await?;

        info!(
            path = %dir.display(),
            entries = manifest.entry_count,
            dimensions,
            model = %manifest.embedding_model,
            "persisted vector index"
        );
        Ok(manifest)
    }

    /// Load an index previously written by [`persist`](Self::persist).
    ///
    /// # Errors
    ///
    /// - [`RagError::FileNotFound`] if the directory, manifest, or entry file is missing
    /// - [`RagError::IncompatibleIndex`] if either file is malformed, the index
    ///   is empty, or any vector disagrees with the manifest dimensionality
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest = read_manifest(dir).await?;

        let entries_path = dir.join(ENTRIES_FILE);
        let raw = read_existing(&entries_path).await?;

        let mut entries = Vec::with_capacity(manifest.entry_count);
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: IndexEntry = serde_json::from_str(line).map_err(|e| {
                RagError::incompatible(&entries_path, format!("line {}: {e}", line_no + 1))
            })?;
            if entry.vector.len() != manifest.dimensions {
                return Err(RagError::incompatible(
                    &entries_path,
                    format!(
                        "line {}: vector has {} dimensions, manifest declares {}",
                        line_no + 1,
                        entry.vector.len(),
                        manifest.dimensions
                    ),
                ));
            }
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(RagError::incompatible(&entries_path, "index contains no entries"));
        }
        if entries.len() != manifest.entry_count {
            return Err(RagError::incompatible(
                &entries_path,
                format!(
                    "manifest declares {} entries, found {}",
                    manifest.entry_count,
                    entries.len()
                ),
            ));
        }

        debug!(path = %dir.display(), entries = entries.len(), "loaded index entries");
        info!(
            path = %dir.display(),
            entries = entries.len(),
            dimensions = manifest.dimensions,
            model = %manifest.embedding_model,
            "loaded vector index"
        );

        Ok(Self::from_state(IndexState {
            entries,
            dimensions: Some(manifest.dimensions),
            embedding_model: manifest.embedding_model,
        }))
    }

    /// Load an index and check it was built for the given embedder.
    ///
    /// # Errors
    ///
    /// Everything [`load`](Self::load) returns, plus
    /// [`RagError::IncompatibleIndex`] if the manifest's dimensionality or
    /// embedding model differs from the expected one. Vectors are never
    /// truncated or padded.
    pub async fn load_compatible(
        dir: impl AsRef<Path>,
        dimensions: usize,
        embedding_model: &str,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest = read_manifest(dir).await?;
        if manifest.dimensions != dimensions {
            return Err(RagError::incompatible(
                dir,
                format!(
                    "index was built with {}-dimensional vectors, embedder produces {dimensions}",
                    manifest.dimensions
                ),
            ));
        }
        if manifest.embedding_model != embedding_model {
            return Err(RagError::incompatible(
                dir,
                format!(
                    "index was built with embedding model '{}', embedder is '{embedding_model}'",
                    manifest.embedding_model
                ),
            ));
        }
        Self::load(dir).await
    }
}

/// Read and validate `manifest.json` in `dir`.
pub async fn read_manifest(dir: impl AsRef<Path>) -> Result<IndexManifest> {
    let dir = dir.as_ref();
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Err(RagError::file_not_found(dir));
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    let raw = read_existing(&manifest_path).await?;
    let manifest: IndexManifest = serde_json::from_str(&raw)
        .map_err(|e| RagError::incompatible(&manifest_path, format!("malformed manifest: {e}")))?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(RagError::incompatible(
            &manifest_path,
            format!("unsupported format version {}", manifest.format_version),
        ));
    }
    if manifest.dimensions == 0 {
        return Err(RagError::incompatible(&manifest_path, "manifest declares zero dimensions"));
    }
    Ok(manifest)
}

async fn read_existing(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RagError::file_not_found(path)),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
