//! Subcommand implementations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docqa_rag::{
    Answer, Chunker, Document, DocumentLoader, EmbeddingProvider, FileLoader, HashEmbedder,
    InMemoryVectorIndex, ModelConfig, OllamaGenerator, RagConfig, RagPipeline, Services, load_dir,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::cli::{ChunkingArgs, EmbedderKind, IndexArgs, ModelArgs, QueryArgs};
use crate::history::ChatHistory;

const PREVIEW_CHARS: usize = 60;

fn base_config(path: Option<&Path>) -> Result<RagConfig> {
    match path {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display())),
        None => Ok(RagConfig::default()),
    }
}

impl ChunkingArgs {
    /// Pipeline settings with the chunking flags applied.
    pub fn to_config(&self) -> Result<RagConfig> {
        let mut config = base_config(self.config.as_deref())?;
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.overlap {
            config.chunk_overlap = overlap;
        }
        config.boundary_aware |= self.boundary_aware;
        config.validate()?;
        Ok(config)
    }
}

impl QueryArgs {
    /// Pipeline settings with the query flags applied.
    pub fn to_config(&self) -> Result<RagConfig> {
        let mut config = base_config(self.config.as_deref())?;
        if let Some(k) = self.top_k {
            config.top_k = k;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_ms = Some(secs.saturating_mul(1000));
        }
        config.validate()?;
        Ok(config)
    }
}

impl ModelArgs {
    /// Ollama settings from the environment with flag overrides.
    pub fn to_model_config(&self) -> ModelConfig {
        let mut config = ModelConfig::from_env();
        if let Some(url) = &self.ollama_url {
            config = config.with_base_url(url);
        }
        if let Some(model) = &self.embed_model {
            config = config.with_embed_model(model);
        }
        if let Some(model) = &self.generate_model {
            config = config.with_generate_model(model);
        }
        config
    }

    /// Build the embedder and generator selected on the command line.
    pub async fn connect(&self) -> Result<Services> {
        let config = self.to_model_config();
        match self.embedder {
            EmbedderKind::Ollama => Services::initialize(&config)
                .await
                .with_context(|| format!("failed to reach Ollama at {}", config.base_url)),
            EmbedderKind::Hash => {
                let embedder = HashEmbedder::new(self.hash_dimensions)?;
                let generator = OllamaGenerator::new(&config)?;
                Ok(Services::new(Arc::new(embedder), Arc::new(generator)))
            }
        }
    }
}

fn load_documents(input: &Path) -> Result<Vec<Document>> {
    let loader = FileLoader::new();
    let documents = if input.is_dir() {
        load_dir(&loader, input)?
    } else {
        vec![loader.load(input)?]
    };
    if documents.is_empty() {
        bail!("no supported documents found in {}", input.display());
    }
    Ok(documents)
}

/// First `PREVIEW_CHARS` characters of `text` on a single line.
fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut short: String = flat.chars().take(PREVIEW_CHARS).collect();
    short.push('…');
    short
}

/// `docqa build`
pub async fn build(
    input: &Path,
    index_args: &IndexArgs,
    chunking: &ChunkingArgs,
    models: &ModelArgs,
) -> Result<()> {
    let config = chunking.to_config()?;
    let documents = {
        let input = input.to_path_buf();
        tokio::task::spawn_blocking(move || load_documents(&input))
            .await
            .context("document loading task failed")??
    };
    let services = models.connect().await?;

    let embedder = services.embedder();
    let index = Arc::new(InMemoryVectorIndex::with_model(embedder.model_name()));
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_index(index.clone())
        .generator(services.generator())
        .build()?;

    let chunks = pipeline.ingest_batch(&documents).await?;
    if chunks.is_empty() {
        bail!("documents in {} contain no text", input.display());
    }
    let manifest = index
        .persist(&index_args.dir)
        .await
        .with_context(|| format!("failed to write index to {}", index_args.dir.display()))?;

    println!(
        "Indexed {} chunks from {} document(s) into {} ({} dimensions, model {})",
        manifest.entry_count,
        documents.len(),
        index_args.dir.display(),
        manifest.dimensions,
        manifest.embedding_model,
    );

    drop(pipeline);
    services.shutdown();
    Ok(())
}

/// `docqa chunks`
pub fn chunks(input: &Path, out: Option<&Path>, chunking: &ChunkingArgs) -> Result<()> {
    let config = chunking.to_config()?;
    let document = FileLoader::new().load(input)?;
    let chunks = config.chunker()?.chunk(&document);

    println!(
        "{}: {} characters, {} chunks (size {}, overlap {})",
        document.id,
        document.char_len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap,
    );
    for chunk in &chunks {
        println!(
            "[{}] {}..{} ({} chars) {}",
            chunk.sequence_index,
            chunk.start_offset,
            chunk.end_offset,
            chunk.char_len(),
            preview(&chunk.text)
        );
    }

    if let Some(out) = out {
        fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
        for chunk in &chunks {
            let path = out.join(format!("chunk_{}.txt", chunk.sequence_index));
            fs::write(&path, &chunk.text)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        info!(path = %out.display(), count = chunks.len(), "exported chunks");
    }
    Ok(())
}

/// A loaded index, the services it was built with, and the pipeline over them.
struct Session {
    pipeline: RagPipeline,
    services: Services,
    top_k: usize,
    show_sources: bool,
}

impl Session {
    async fn open(index_args: &IndexArgs, query: &QueryArgs, models: &ModelArgs) -> Result<Self> {
        let config = query.to_config()?;
        let services = models.connect().await?;
        let embedder = services.embedder();

        let index = InMemoryVectorIndex::load_compatible(
            &index_args.dir,
            embedder.dimensions(),
            embedder.model_name(),
        )
        .await
        .with_context(|| format!("failed to load index {}", index_args.dir.display()))?;

        let top_k = config.top_k;
        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(embedder)
            .vector_index(Arc::new(index))
            .generator(services.generator())
            .build()?;

        Ok(Self { pipeline, services, top_k, show_sources: query.show_sources })
    }

    async fn answer(&self, question: &str) -> Result<Answer> {
        Ok(self.pipeline.answer_with_sources(question, self.top_k).await?)
    }

    fn print(&self, answer: &Answer) {
        println!("{}", answer.text.trim());
        if self.show_sources {
            println!();
            for (i, source) in answer.sources.iter().enumerate() {
                println!(
                    "  [{}] {} (chunk {}, score {:.3}) {}",
                    i + 1,
                    source.chunk.source_id,
                    source.chunk.sequence_index,
                    source.score,
                    preview(&source.chunk.text)
                );
            }
        }
    }

    fn close(self) {
        drop(self.pipeline);
        self.services.shutdown();
    }
}

/// `docqa ask`
pub async fn ask(
    question: &str,
    index_args: &IndexArgs,
    query: &QueryArgs,
    models: &ModelArgs,
) -> Result<()> {
    let session = Session::open(index_args, query, models).await?;
    let answer = session.answer(question).await?;
    session.print(&answer);
    session.close();
    Ok(())
}

/// `docqa chat`
pub async fn chat(index_args: &IndexArgs, query: &QueryArgs, models: &ModelArgs) -> Result<()> {
    let session = Session::open(index_args, query, models).await?;
    let mut editor = DefaultEditor::new()?;
    let mut history = ChatHistory::new();

    println!("Ask a question about the document. Commands: /history, /clear, /quit");
    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                print!("{history}");
                continue;
            }
            "/clear" => {
                history.clear();
                println!("History cleared.");
                continue;
            }
            _ => {}
        }
        let _ = editor.add_history_entry(question);

        match session.answer(question).await {
            Ok(answer) => {
                session.print(&answer);
                history.push(question, answer.text);
                println!("\n--- Chat history ---");
                print!("{history}");
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                eprintln!("Error: {e:#}");
            }
        }
    }

    session.close();
    Ok(())
}
