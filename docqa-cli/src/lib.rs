//! The `docqa` command-line tool.
//!
//! Subcommands:
//! - `build` - load documents, embed their chunks, persist an index
//! - `chunks` - show (and optionally export) how a document is chunked
//! - `ask` - answer one question from an index
//! - `chat` - interactive session with a running question/answer history

pub mod cli;
pub mod commands;
pub mod history;

use cli::{Cli, Command};

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Build { input, index, chunking, models } => {
            commands::build(&input, &index, &chunking, &models).await
        }
        Command::Chunks { input, out, chunking } => commands::chunks(&input, out.as_deref(), &chunking),
        Command::Ask { question, index, query, models } => {
            commands::ask(&question.join(" "), &index, &query, &models).await
        }
        Command::Chat { index, query, models } => commands::chat(&index, &query, &models).await,
    }
}
