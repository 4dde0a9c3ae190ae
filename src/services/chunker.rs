//! Token-window chunking with overlap.

use std::sync::Arc;

use crate::error::ChunkError;
use crate::models::{IndexingConfig, PageContent, PdfDocument, TextChunk};
use crate::services::tokenizer::TokenCodec;

/// Splits page text into overlapping, token-bounded chunks.
///
/// Boundaries are chosen purely by token position. Page boundaries are hard
/// chunk boundaries, which keeps page-level citations accurate.
pub struct TextChunker {
    codec: Arc<dyn TokenCodec>,
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(codec: Arc<dyn TokenCodec>, config: &IndexingConfig) -> Result<Self, ChunkError> {
        if config.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be at least 1 token".to_string(),
            ));
        }
        Ok(Self {
            codec,
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
        })
    }

    /// Chunk a single page's text.
    ///
    /// The window start advances by `chunk_size - overlap` tokens each step;
    /// if that step is zero (overlap >= chunk_size) the first window is
    /// emitted and the loop terminates rather than stalling.
    pub fn chunk_page(&self, page: &PageContent) -> Result<Vec<TextChunk>, ChunkError> {
        let text = page.text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.codec.encode(text)?;
        let total = tokens.len();

        if total <= self.chunk_size {
            return Ok(vec![TextChunk {
                id: TextChunk::generate_id(&page.filename, page.page_number, 0, text),
                text: text.to_string(),
                source_pdf: page.filename.clone(),
                page: page.page_number,
                token_count: total,
            }]);
        }

        let step = self.chunk_size.saturating_sub(self.overlap);
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chunk_index = 0;

        loop {
            let end = (start + self.chunk_size).min(total);
            let window = &tokens[start..end];
            let chunk_text = self.codec.decode(window)?.trim().to_string();

            // Tokenizer boundaries can decode to nothing; such windows are
            // skipped and do not consume a chunk index.
            if !chunk_text.is_empty() {
                chunks.push(TextChunk {
                    id: TextChunk::generate_id(
                        &page.filename,
                        page.page_number,
                        chunk_index,
                        &chunk_text,
                    ),
                    text: chunk_text,
                    source_pdf: page.filename.clone(),
                    page: page.page_number,
                    token_count: window.len(),
                });
                chunk_index += 1;
            }

            if end >= total || step == 0 {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }

    /// Chunk all pages of a document, in page order.
    pub fn chunk_document(&self, document: &PdfDocument) -> Result<Vec<TextChunk>, ChunkError> {
        let mut chunks = Vec::new();
        for page in &document.pages {
            chunks.extend(self.chunk_page(page)?);
        }
        Ok(chunks)
    }

    /// Chunk every document of a corpus.
    pub fn chunk_documents(&self, documents: &[PdfDocument]) -> Result<Vec<TextChunk>, ChunkError> {
        let mut chunks = Vec::new();
        for document in documents {
            chunks.extend(self.chunk_document(document)?);
        }
        Ok(chunks)
    }
}
