//! Index command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::{OutputFormat, get_formatter};
use crate::models::Config;
use crate::services::{
    EmbeddingClient, HfTokenCodec, IndexingPipeline, PdfLoader, PineconeIndex,
    SparseEncoderCache, TextChunker, VectorIndex,
};

#[derive(Debug, Subcommand)]
pub enum IndexCommand {
    /// Populate the vector index from a directory of PDF files
    Run {
        /// Directory containing PDF files (defaults to configured pdf_dir)
        #[arg(long)]
        pdf_dir: Option<PathBuf>,

        /// Re-index even if the store already contains vectors
        #[arg(long)]
        force: bool,
    },

    /// Delete every vector in the index
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
    },
}

pub async fn handle_index(cmd: IndexCommand, format: OutputFormat, verbose: bool) -> Result<()> {
    match cmd {
        IndexCommand::Run { pdf_dir, force } => handle_run(pdf_dir, force, format, verbose).await,
        IndexCommand::Clear { force } => handle_clear(force, format, verbose).await,
    }
}

/// Build the indexing pipeline from configuration. Client construction fails
/// fast on missing credentials, before anything is loaded.
pub fn build_pipeline(config: &Config) -> Result<IndexingPipeline> {
    let codec = HfTokenCodec::from_file(&config.indexing.tokenizer_path)
        .context("failed to load tokenizer vocabulary")?;
    let chunker = TextChunker::new(Arc::new(codec), &config.indexing)
        .context("invalid chunking configuration")?;
    let embedder =
        Arc::new(EmbeddingClient::new(&config.embedding).context("embedding client setup failed")?);
    let index =
        Arc::new(PineconeIndex::new(&config.vector_store).context("vector index setup failed")?);
    let sparse_cache = Arc::new(SparseEncoderCache::new(
        config.indexing.bm25_model_path.clone(),
    ));

    Ok(IndexingPipeline::new(
        PdfLoader::new(),
        chunker,
        embedder,
        index,
        sparse_cache,
    ))
}

async fn handle_run(
    pdf_dir: Option<PathBuf>,
    force: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let pdf_dir = pdf_dir.unwrap_or_else(|| config.indexing.pdf_dir.clone());
    if verbose {
        eprintln!("Indexing PDFs from {}", pdf_dir.display());
    }

    let pipeline = build_pipeline(&config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message("Indexing documents...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let outcome = pipeline.run(&pdf_dir, force).await;
    spinner.finish_and_clear();

    let outcome = outcome.context("indexing run failed")?;

    if verbose {
        eprintln!("Total: {}ms", start_time.elapsed().as_millis());
    }

    print!("{}", formatter.format_index_outcome(&outcome));
    Ok(())
}

async fn handle_clear(force: bool, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    if !force {
        println!("This will delete ALL vectors from the index. Continue? [y/N]");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", formatter.format_message("Cancelled."));
            return Ok(());
        }
    }

    if verbose {
        eprintln!("Clearing vector index...");
    }

    let index = PineconeIndex::new(&config.vector_store).context("vector index setup failed")?;
    index.delete_all().await.context("failed to clear index")?;

    println!(
        "{}",
        formatter.format_message("All vectors deleted from the index.")
    );
    Ok(())
}
