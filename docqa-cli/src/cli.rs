//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "docqa", author, version)]
#[command(about = "Ask questions about PDF and text documents")]
#[command(long_about = r#"
Builds a vector index from documents and answers questions using the
passages most relevant to each question.

Examples:
  docqa build --input manual.pdf --index ./manual-index
  docqa chunks --input manual.pdf --out ./chunks
  docqa ask --index ./manual-index "How do I reset the device?"
  docqa chat --index ./manual-index
"#)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load documents, embed their chunks and write an index directory
    Build {
        /// A document, or a directory searched recursively for documents
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        index: IndexArgs,

        #[command(flatten)]
        chunking: ChunkingArgs,

        #[command(flatten)]
        models: ModelArgs,
    },

    /// Show how a document is split into chunks
    Chunks {
        /// The document to split
        #[arg(short, long)]
        input: PathBuf,

        /// Also write each chunk to `chunk_<n>.txt` in this directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// Answer a single question
    Ask {
        /// The question to answer
        #[arg(required = true)]
        question: Vec<String>,

        #[command(flatten)]
        index: IndexArgs,

        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        models: ModelArgs,
    },

    /// Interactive question-answering session
    Chat {
        #[command(flatten)]
        index: IndexArgs,

        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        models: ModelArgs,
    },
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Index directory
    #[arg(long = "index", env = "DOCQA_INDEX", default_value = "docqa-index")]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ChunkingArgs {
    /// JSON file with pipeline settings; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum characters per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Prefer cutting chunks at paragraph, sentence or word breaks
    #[arg(long)]
    pub boundary_aware: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// JSON file with pipeline settings; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of chunks handed to the generator
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Seconds allowed for each model call
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the chunks each answer was based on
    #[arg(long)]
    pub show_sources: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Embeddings from an Ollama server
    Ollama,
    /// Offline hashed bag-of-words embeddings
    Hash,
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Ollama)]
    pub embedder: EmbedderKind,

    /// Vector length for the hash embedder
    #[arg(long, default_value_t = 384)]
    pub hash_dimensions: usize,

    /// Ollama server URL
    #[arg(long, env = "DOCQA_OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Ollama embedding model
    #[arg(long, env = "DOCQA_EMBED_MODEL")]
    pub embed_model: Option<String>,

    /// Ollama generation model
    #[arg(long, env = "DOCQA_GENERATE_MODEL")]
    pub generate_model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_multi_word_question() {
        let cli = Cli::try_parse_from([
            "docqa", "ask", "--index", "idx", "-k", "2", "what", "is", "a", "pod?",
        ])
        .unwrap();
        match cli.command {
            Command::Ask { question, index, query, .. } => {
                assert_eq!(question.join(" "), "what is a pod?");
                assert_eq!(index.dir, PathBuf::from("idx"));
                assert_eq!(query.top_k, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_build_with_hash_embedder() {
        let cli = Cli::try_parse_from([
            "docqa",
            "build",
            "--input",
            "manual.pdf",
            "--chunk-size",
            "500",
            "--overlap",
            "50",
            "--boundary-aware",
            "--embedder",
            "hash",
        ])
        .unwrap();
        match cli.command {
            Command::Build { chunking, models, .. } => {
                assert_eq!(chunking.chunk_size, Some(500));
                assert_eq!(chunking.overlap, Some(50));
                assert!(chunking.boundary_aware);
                assert_eq!(models.embedder, EmbedderKind::Hash);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
