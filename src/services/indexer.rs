//! One-shot indexing pipeline: load -> chunk -> embed -> upsert, guarded by
//! an emptiness check so repeated startups never duplicate a corpus.

use std::path::Path;
use std::sync::Arc;

use crate::error::IndexError;
use crate::models::PdfDocument;
use crate::services::chunker::TextChunker;
use crate::services::embedding::Embedder;
use crate::services::loader::PdfLoader;
use crate::services::sparse::{Bm25Encoder, SparseEncoderCache};
use crate::services::vector_store::{SparseVector, VectorIndex};

/// Result of an indexing run.
#[derive(Debug)]
pub enum IndexOutcome {
    /// The store already holds vectors and `force` was not set. Nothing was
    /// loaded, embedded, or written.
    Skipped { existing_vectors: u64 },
    /// No PDF documents could be loaded from the directory.
    NoDocuments,
    /// Documents loaded but chunking produced nothing to index.
    NoChunks,
    Completed(IndexReport),
}

/// Counts reported after a completed run.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub vectors_upserted: usize,
    pub files_failed: usize,
}

/// Composes loader, chunker, embedder, sparse encoder, and vector index into
/// a single sequential population pipeline.
pub struct IndexingPipeline {
    loader: PdfLoader,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    sparse_cache: Arc<SparseEncoderCache>,
}

impl IndexingPipeline {
    pub fn new(
        loader: PdfLoader,
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        sparse_cache: Arc<SparseEncoderCache>,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            index,
            sparse_cache,
        }
    }

    /// Run the full pipeline once.
    ///
    /// With `force` unset, a non-empty store short-circuits the run before
    /// any document is read. Early no-op exits (no PDFs, no chunks) happen
    /// before the embedding service or the store's write path is contacted.
    pub async fn run(&self, pdf_dir: &Path, force: bool) -> Result<IndexOutcome, IndexError> {
        if !force && !self.index.is_empty().await? {
            let stats = self.index.stats().await?;
            return Ok(IndexOutcome::Skipped {
                existing_vectors: stats.total_vectors,
            });
        }

        let loaded = self.loader.load_directory(pdf_dir)?;
        if loaded.documents.is_empty() {
            return Ok(IndexOutcome::NoDocuments);
        }

        self.index_documents(&loaded.documents, loaded.failures.len())
            .await
    }

    /// Steady-state entry point: index only when the store is empty.
    /// Intended to run once per process lifetime at startup.
    pub async fn ensure_indexed(&self, pdf_dir: &Path) -> Result<IndexOutcome, IndexError> {
        self.run(pdf_dir, false).await
    }

    /// Chunk, embed, and upsert already-loaded documents.
    pub async fn index_documents(
        &self,
        documents: &[PdfDocument],
        files_failed: usize,
    ) -> Result<IndexOutcome, IndexError> {
        let chunks = self.chunker.chunk_documents(documents)?;
        if chunks.is_empty() {
            return Ok(IndexOutcome::NoChunks);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();

        // Fit the keyword encoder before any paid API call.
        let encoder = Bm25Encoder::fit(&texts)?;
        encoder.save(self.sparse_cache.path())?;
        let encoder = self.sparse_cache.replace(encoder);
        let sparse: Vec<SparseVector> = texts
            .iter()
            .map(|text| encoder.encode_document(text))
            .collect();

        let vectors = self.embedder.embed_batch(&texts).await?;
        let vectors_upserted = self.index.upsert(&chunks, &vectors, Some(&sparse)).await?;

        Ok(IndexOutcome::Completed(IndexReport {
            documents: documents.len(),
            pages: documents.iter().map(PdfDocument::page_count).sum(),
            chunks: chunks.len(),
            vectors_upserted,
            files_failed,
        }))
    }
}
