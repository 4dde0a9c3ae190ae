//! Similarity-gated retrieval: embed the question, query the index, and
//! either assemble a grounded context or report that the corpus holds no
//! usable evidence. Insufficient evidence is a normal outcome, not an error;
//! callers must not generate an answer from it.

use std::sync::Arc;

use crate::error::QueryError;
use crate::models::{RetrievalConfig, RetrievedChunk};
use crate::services::embedding::Embedder;
use crate::services::sparse::SparseEncoderCache;
use crate::services::vector_store::VectorIndex;

/// A unique (source, page) citation pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub source_pdf: String,
    pub page: u32,
}

/// Context assembled from retrieved chunks, ready for the generator.
#[derive(Debug, Clone)]
pub struct GroundedContext {
    /// Chunk texts tagged with source index and page, in retrieval order.
    pub context: String,
    /// Deduplicated citations in first-seen order.
    pub sources: Vec<Citation>,
    pub chunks: Vec<RetrievedChunk>,
    pub best_score: f32,
}

/// Outcome of a gated retrieval.
#[derive(Debug)]
pub enum RetrievalOutcome {
    Grounded(GroundedContext),
    /// No chunks came back, or the best score fell below the threshold.
    Insufficient { best_score: Option<f32> },
}

/// Embeds queries and gates retrieval on similarity quality.
pub struct RetrievalGate {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    sparse_cache: Arc<SparseEncoderCache>,
    config: RetrievalConfig,
}

impl RetrievalGate {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        sparse_cache: Arc<SparseEncoderCache>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            sparse_cache,
            config,
        }
    }

    /// Retrieve evidence for a question.
    ///
    /// The threshold boundary is inclusive: a best score exactly at the
    /// configured minimum counts as usable evidence.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalOutcome, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidQuery("question is empty".to_string()));
        }

        // Hybrid mode requires a fitted keyword model; its absence means
        // indexing has never run and is fatal for this query.
        let sparse = if self.config.hybrid {
            let encoder = self.sparse_cache.get_or_load()?;
            Some(encoder.encode_query(question))
        } else {
            None
        };

        let vector = self.embedder.embed_query(question).await?;
        let chunks = self
            .index
            .query_similar(&vector, sparse.as_ref(), self.config.top_k as usize)
            .await?;

        let best_score = chunks
            .iter()
            .map(|chunk| chunk.score)
            .fold(None, |best: Option<f32>, score| {
                Some(best.map_or(score, |b| b.max(score)))
            });

        match best_score {
            Some(score) if score >= self.config.similarity_threshold => {
                Ok(RetrievalOutcome::Grounded(GroundedContext {
                    context: format_context(&chunks),
                    sources: extract_sources(&chunks),
                    chunks,
                    best_score: score,
                }))
            }
            _ => Ok(RetrievalOutcome::Insufficient { best_score }),
        }
    }
}

/// Deduplicate retrieved chunks into citation pairs, preserving first-seen
/// order.
pub fn extract_sources(chunks: &[RetrievedChunk]) -> Vec<Citation> {
    let mut sources: Vec<Citation> = Vec::new();
    for chunk in chunks {
        let citation = Citation {
            source_pdf: chunk.source_pdf.clone(),
            page: chunk.page,
        };
        if !sources.contains(&citation) {
            sources.push(citation);
        }
    }
    sources
}

/// Format chunks into an ordered context block, each tagged with a source
/// index and page number.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    let parts: Vec<String> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Source {}: {}, Page {}]\n{}",
                i + 1,
                chunk.source_pdf,
                chunk.page,
                chunk.text
            )
        })
        .collect();
    parts.join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::{EmbeddingError, SparseError, VectorStoreError};
    use crate::models::TextChunk;
    use crate::services::sparse::Bm25Encoder;
    use crate::services::vector_store::{IndexStats, SparseVector};
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct FixedIndex {
        results: Vec<RetrievedChunk>,
        saw_sparse: Mutex<bool>,
    }

    impl FixedIndex {
        fn returning(results: Vec<RetrievedChunk>) -> Self {
            Self {
                results,
                saw_sparse: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn stats(&self) -> Result<IndexStats, VectorStoreError> {
            Ok(IndexStats::default())
        }

        async fn upsert(
            &self,
            _chunks: &[TextChunk],
            _vectors: &[Vec<f32>],
            _sparse: Option<&[SparseVector]>,
        ) -> Result<usize, VectorStoreError> {
            Ok(0)
        }

        async fn query_similar(
            &self,
            _vector: &[f32],
            sparse: Option<&SparseVector>,
            _top_k: usize,
        ) -> Result<Vec<RetrievedChunk>, VectorStoreError> {
            *self.saw_sparse.lock().unwrap() = sparse.is_some();
            Ok(self.results.clone())
        }

        async fn delete_all(&self) -> Result<(), VectorStoreError> {
            Ok(())
        }
    }

    fn retrieved(source: &str, page: u32, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            id: format!("{}__p{}__c0__aaaaaaaa", source, page),
            text: format!("text from {} page {}", source, page),
            source_pdf: format!("{}.pdf", source),
            page,
            score,
        }
    }

    fn gate(results: Vec<RetrievedChunk>, hybrid: bool, cache: SparseEncoderCache) -> RetrievalGate {
        RetrievalGate::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex::returning(results)),
            Arc::new(cache),
            RetrievalConfig {
                hybrid,
                ..Default::default()
            },
        )
    }

    fn empty_cache() -> SparseEncoderCache {
        SparseEncoderCache::new(std::env::temp_dir().join("pdfrag_absent_model.json"))
    }

    #[tokio::test]
    async fn test_best_score_at_threshold_is_usable() {
        let gate = gate(
            vec![retrieved("a", 1, 0.2), retrieved("a", 2, 0.3)],
            false,
            empty_cache(),
        );

        let outcome = gate.retrieve("what is the deadline?").await.unwrap();
        match outcome {
            RetrievalOutcome::Grounded(grounded) => {
                assert_eq!(grounded.best_score, 0.3);
                assert_eq!(grounded.chunks.len(), 2);
            }
            other => panic!("expected grounded outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_best_score_below_threshold_is_insufficient() {
        let gate = gate(vec![retrieved("a", 1, 0.29)], false, empty_cache());

        let outcome = gate.retrieve("capital of france?").await.unwrap();
        match outcome {
            RetrievalOutcome::Insufficient { best_score } => {
                assert_eq!(best_score, Some(0.29));
            }
            other => panic!("expected insufficient outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_results_is_insufficient() {
        let gate = gate(Vec::new(), false, empty_cache());

        let outcome = gate.retrieve("anything at all?").await.unwrap();
        assert!(matches!(
            outcome,
            RetrievalOutcome::Insufficient { best_score: None }
        ));
    }

    #[tokio::test]
    async fn test_empty_question_is_invalid() {
        let gate = gate(Vec::new(), false, empty_cache());
        let result = gate.retrieve("   ").await;
        assert!(matches!(result, Err(QueryError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_hybrid_without_fitted_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SparseEncoderCache::new(dir.path().join("missing.json"));
        let gate = gate(vec![retrieved("a", 1, 0.9)], true, cache);

        let result = gate.retrieve("question").await;
        assert!(matches!(
            result,
            Err(QueryError::SparseError(SparseError::NotFitted(_)))
        ));
    }

    #[tokio::test]
    async fn test_hybrid_attaches_sparse_query_vector() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SparseEncoderCache::new(dir.path().join("bm25_model.json"));
        cache.replace(Bm25Encoder::fit(&["some corpus text".to_string()]).unwrap());

        let index = Arc::new(FixedIndex::returning(vec![retrieved("a", 1, 0.9)]));
        let gate = RetrievalGate::new(
            Arc::new(FixedEmbedder),
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            Arc::new(cache),
            RetrievalConfig {
                hybrid: true,
                ..Default::default()
            },
        );

        gate.retrieve("question").await.unwrap();
        assert!(*index.saw_sparse.lock().unwrap());
    }

    #[test]
    fn test_sources_deduplicate_in_first_seen_order() {
        let chunks = vec![
            retrieved("guide", 4, 0.9),
            retrieved("handbook", 1, 0.8),
            retrieved("guide", 4, 0.7),
            retrieved("guide", 2, 0.6),
        ];

        let sources = extract_sources(&chunks);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].source_pdf, "guide.pdf");
        assert_eq!(sources[0].page, 4);
        assert_eq!(sources[1].source_pdf, "handbook.pdf");
        assert_eq!(sources[2].page, 2);
    }

    #[test]
    fn test_context_block_tags_each_chunk() {
        let chunks = vec![retrieved("guide", 4, 0.9), retrieved("handbook", 1, 0.8)];
        let context = format_context(&chunks);

        assert!(context.starts_with("[Source 1: guide.pdf, Page 4]\n"));
        assert!(context.contains("\n\n---\n\n[Source 2: handbook.pdf, Page 1]\n"));
        assert!(context.contains("text from guide page 4"));
    }
}
