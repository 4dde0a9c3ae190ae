//! CLI module for the PDF RAG CLI.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::cli::output::OutputFormat;

/// RAG indexing and retrieval CLI for PDF document collections.
#[derive(Debug, Parser)]
#[command(name = "pdfrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check vector index status
    Status,

    /// Manage the vector index (run, clear)
    #[command(subcommand)]
    Index(commands::IndexCommand),

    /// Ask a single question against the indexed documents
    Ask(commands::AskArgs),

    /// Interactive question-answering session
    Chat(commands::ChatArgs),
}
