//! Loading documents from disk.
//!
//! [`FileLoader`] reads PDFs (via `pdf-extract`, behind the `pdf` feature) and
//! UTF-8 text or Markdown files. [`load_dir`] walks a directory and loads
//! every supported file in path order.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// A source of [`Document`]s.
pub trait DocumentLoader: Send + Sync {
    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// [`RagError::FileNotFound`] if `path` is not a readable file,
    /// [`RagError::UnsupportedFormat`] if it cannot be parsed.
    fn load(&self, path: &Path) -> Result<Document>;

    /// Whether this loader accepts files with the given path.
    fn supports(&self, path: &Path) -> bool;
}

/// Document formats recognised by [`FileLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Plain UTF-8 text.
    Text,
    /// Markdown, loaded as plain text.
    Markdown,
}

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Short name stored in document metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }
}

/// Loads documents by dispatching on file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// Create a new file loader.
    pub fn new() -> Self {
        Self
    }

    #[cfg(feature = "pdf")]
    fn read_pdf(path: &Path, bytes: &[u8]) -> Result<(String, Option<usize>)> {
        let text = isolate_panics(path, || {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
        })?
        .map_err(|e| RagError::unsupported(path, format!("failed to extract PDF text: {e}")))?;
        let page_count = isolate_panics(path, || {
            lopdf::Document::load_mem(bytes).ok().map(|doc| doc.get_pages().len())
        })
        .ok()
        .flatten();
        Ok((text, page_count))
    }

    #[cfg(not(feature = "pdf"))]
    fn read_pdf(path: &Path, _bytes: &[u8]) -> Result<(String, Option<usize>)> {
        Err(RagError::unsupported(path, "PDF support requires the `pdf` feature"))
    }
}

/// Run a PDF parser on a scoped thread and turn a panic into
/// [`RagError::UnsupportedFormat`]. The parsers panic on some malformed files.
#[cfg(feature = "pdf")]
fn isolate_panics<T: Send>(path: &Path, parse: impl FnOnce() -> T + Send) -> Result<T> {
    std::thread::scope(|scope| scope.spawn(parse).join()).map_err(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!(path = %path.display(), %detail, "PDF parser panicked");
        RagError::unsupported(path, format!("PDF parser panicked: {detail}"))
    })
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        if !path.is_file() {
            return Err(RagError::file_not_found(path));
        }
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            RagError::unsupported(path, "expected a .pdf, .txt, or .md file")
        })?;

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RagError::file_not_found(path),
            _ => RagError::Io(e),
        })?;

        let (text, page_count) = match format {
            DocumentFormat::Pdf => Self::read_pdf(path, &bytes)?,
            DocumentFormat::Text | DocumentFormat::Markdown => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| RagError::unsupported(path, format!("not valid UTF-8: {e}")))?;
                (text, None)
            }
        };

        info!(
            path = %path.display(),
            format = format.as_str(),
            chars = text.chars().count(),
            page_count,
            "loaded document"
        );

        let mut document = Document::new(path.display().to_string(), text)
            .with_metadata("format", format.as_str());
        if let Some(pages) = page_count {
            document = document.with_metadata("page_count", pages.to_string());
        }
        Ok(document)
    }

    fn supports(&self, path: &Path) -> bool {
        DocumentFormat::from_path(path).is_some()
    }
}

/// Load every file under `dir` that `loader` supports, sorted by path.
///
/// Files with unsupported extensions are skipped. A supported file that fails
/// to parse fails the whole call.
///
/// # Errors
///
/// [`RagError::FileNotFound`] if `dir` is not a directory, or the first error
/// returned by `loader`.
pub fn load_dir(loader: &dyn DocumentLoader, dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::file_not_found(dir));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let mut documents = Vec::new();
    for path in files {
        if !loader.supports(&path) {
            debug!(path = %path.display(), "skipping unsupported file");
            continue;
        }
        documents.push(loader.load(&path)?);
    }

    if documents.is_empty() {
        warn!(path = %dir.display(), "no supported documents found");
    }
    Ok(documents)
}
