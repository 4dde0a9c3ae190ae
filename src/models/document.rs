use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extracted content of a single PDF page.
///
/// Pages whose extracted text is empty after stripping are never represented;
/// the loader drops them before they reach the chunker.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub filename: String,
    /// 1-based physical page number.
    pub page_number: u32,
    pub text: String,
}

/// A loaded PDF document with its non-empty pages in physical order.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub filename: String,
    pub pages: Vec<PageContent>,
}

impl PdfDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A token-bounded span of one page's text, the atomic unit stored and
/// retrieved. A chunk never spans more than one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: String,
    pub text: String,
    pub source_pdf: String,
    pub page: u32,
    /// Number of tokenizer units in `text` under the corpus-wide tokenizer.
    pub token_count: usize,
}

impl TextChunk {
    /// Generate a deterministic chunk id.
    ///
    /// The id is readable — `{stem}__p{page}__c{index}__{suffix}` — and the
    /// suffix is derived from the chunk text as well as its coordinates, so
    /// re-chunking identical input reproduces the same ids while corpora that
    /// merely share filenames and page layout do not collide.
    pub fn generate_id(source_pdf: &str, page: u32, chunk_index: usize, text: &str) -> String {
        let name = format!("{}:{}:{}:{}", source_pdf, page, chunk_index, text);
        let suffix = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string();
        let stem = source_pdf.strip_suffix(".pdf").unwrap_or(source_pdf);
        format!("{}__p{}__c{}__{}", stem, page, chunk_index, &suffix[..8])
    }
}

/// A chunk returned by a similarity query, annotated with its score.
///
/// Produced fresh on every query and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub source_pdf: String,
    pub page: u32,
    /// Similarity score from the index; higher means more similar.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = TextChunk::generate_id("handbook.pdf", 3, 1, "some chunk text");
        let b = TextChunk::generate_id("handbook.pdf", 3, 1, "some chunk text");
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_id_depends_on_content() {
        let a = TextChunk::generate_id("handbook.pdf", 3, 1, "first corpus text");
        let b = TextChunk::generate_id("handbook.pdf", 3, 1, "second corpus text");
        assert_ne!(a, b);
    }

    #[test]
    fn test_chunk_id_format() {
        let id = TextChunk::generate_id("handbook.pdf", 2, 0, "text");
        assert!(id.starts_with("handbook__p2__c0__"));
        let suffix = id.rsplit("__").next().unwrap();
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn test_chunk_id_distinguishes_coordinates() {
        let by_page = TextChunk::generate_id("a.pdf", 1, 0, "text");
        let by_index = TextChunk::generate_id("a.pdf", 2, 0, "text");
        let by_source = TextChunk::generate_id("b.pdf", 1, 0, "text");
        assert_ne!(by_page, by_index);
        assert_ne!(by_page, by_source);
    }
}
