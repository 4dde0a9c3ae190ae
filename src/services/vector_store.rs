//! Pinecone data-plane client.
//!
//! The index is the single source of truth for persisted chunks. Upserts are
//! idempotent by chunk id: re-writing an id overwrites its vector and
//! metadata, which is what makes re-running the chunker on identical input
//! safe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, VectorStoreError};
use crate::models::{
    PINECONE_API_KEY_ENV, PINECONE_INDEX_HOST_ENV, RetrievedChunk, TextChunk, VectorStoreConfig,
    require_env,
};

/// A BM25 sparse vector in Pinecone's indices/values form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

/// Read-only index statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(rename = "totalVectorCount", default)]
    pub total_vectors: u64,

    #[serde(default)]
    pub dimension: u64,

    #[serde(rename = "indexFullness", default)]
    pub fullness: f32,
}

/// Operations the pipeline needs from the external vector store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn stats(&self) -> Result<IndexStats, VectorStoreError>;

    /// True iff the store reports zero total vectors. Used as the idempotency
    /// gate for indexing.
    async fn is_empty(&self) -> Result<bool, VectorStoreError> {
        Ok(self.stats().await?.total_vectors == 0)
    }

    /// Write chunks with their vectors, keyed by chunk id. Returns the total
    /// count sent. Requires equal lengths; no partial write is attempted on a
    /// mismatch.
    async fn upsert(
        &self,
        chunks: &[TextChunk],
        vectors: &[Vec<f32>],
        sparse: Option<&[SparseVector]>,
    ) -> Result<usize, VectorStoreError>;

    /// Return up to `top_k` nearest neighbors, most similar first.
    async fn query_similar(
        &self,
        vector: &[f32],
        sparse: Option<&SparseVector>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError>;

    /// Destructive full-index wipe. Administrative only.
    async fn delete_all(&self) -> Result<(), VectorStoreError>;
}

#[derive(Debug, Serialize)]
struct WireMetadata {
    text: String,
    source_pdf: String,
    page: u32,
}

#[derive(Debug, Serialize)]
struct WireVector {
    id: String,
    values: Vec<f32>,
    metadata: WireMetadata,
    #[serde(rename = "sparseValues", skip_serializing_if = "Option::is_none")]
    sparse_values: Option<SparseVector>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [WireVector],
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "sparseVector", skip_serializing_if = "Option::is_none")]
    sparse_vector: Option<&'a SparseVector>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Retrieved entries can come back with partial metadata; every field
/// degrades to a documented default instead of failing the query.
#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    source_pdf: Option<String>,
    #[serde(default)]
    page: Option<f64>,
}

impl From<QueryMatch> for RetrievedChunk {
    fn from(m: QueryMatch) -> Self {
        let metadata = m.metadata.unwrap_or_default();
        RetrievedChunk {
            id: m.id,
            text: metadata.text.unwrap_or_default(),
            source_pdf: metadata
                .source_pdf
                .unwrap_or_else(|| "unknown".to_string()),
            page: metadata.page.map(|p| p as u32).unwrap_or(0),
            score: m.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    #[serde(rename = "deleteAll")]
    delete_all: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

/// Client for one Pinecone index's data plane.
pub struct PineconeIndex {
    client: Client,
    host: String,
    namespace: String,
    upsert_batch_size: usize,
}

impl PineconeIndex {
    /// Create a new index client. Missing credentials or host fail here,
    /// before any request is made.
    pub fn new(config: &VectorStoreConfig) -> Result<Self, ConfigError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => require_env(PINECONE_API_KEY_ENV)?,
        };
        let host = match &config.host {
            Some(host) => host.clone(),
            None => require_env(PINECONE_INDEX_HOST_ENV)?,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|e| ConfigError::HttpClientError(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClientError(e.to_string()))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            upsert_batch_size: config.upsert_batch_size as usize,
        })
    }

    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, VectorStoreError> {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::ServiceError { status, message });
        }

        Ok(response)
    }
}

fn wire_vectors(
    chunks: &[TextChunk],
    vectors: &[Vec<f32>],
    sparse: Option<&[SparseVector]>,
) -> Vec<WireVector> {
    chunks
        .iter()
        .zip(vectors.iter())
        .enumerate()
        .map(|(i, (chunk, vector))| WireVector {
            id: chunk.id.clone(),
            values: vector.clone(),
            metadata: WireMetadata {
                text: chunk.text.clone(),
                source_pdf: chunk.source_pdf.clone(),
                page: chunk.page,
            },
            sparse_values: sparse.map(|s| s[i].clone()),
        })
        .collect()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn stats(&self) -> Result<IndexStats, VectorStoreError> {
        let response = self
            .post_json("/describe_index_stats", &serde_json::json!({}))
            .await?;
        response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))
    }

    async fn upsert(
        &self,
        chunks: &[TextChunk],
        vectors: &[Vec<f32>],
        sparse: Option<&[SparseVector]>,
    ) -> Result<usize, VectorStoreError> {
        if chunks.len() != vectors.len() {
            return Err(VectorStoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if let Some(sparse) = sparse
            && sparse.len() != chunks.len()
        {
            return Err(VectorStoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: sparse.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let wire = wire_vectors(chunks, vectors, sparse);
        let mut total_upserted = 0;

        for batch in wire.chunks(self.upsert_batch_size) {
            let request = UpsertRequest {
                vectors: batch,
                namespace: &self.namespace,
            };
            self.post_json("/vectors/upsert", &request).await?;
            total_upserted += batch.len();
        }

        Ok(total_upserted)
    }

    async fn query_similar(
        &self,
        vector: &[f32],
        sparse: Option<&SparseVector>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError> {
        let request = QueryRequest {
            vector,
            sparse_vector: sparse,
            top_k,
            include_metadata: true,
            namespace: &self.namespace,
        };

        let response = self.post_json("/query", &request).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;

        Ok(parsed.matches.into_iter().map(RetrievedChunk::from).collect())
    }

    async fn delete_all(&self) -> Result<(), VectorStoreError> {
        let request = DeleteRequest {
            delete_all: true,
            namespace: &self.namespace,
        };
        self.post_json("/vectors/delete", &request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VectorStoreConfig {
        VectorStoreConfig {
            host: Some("http://127.0.0.1:1".to_string()),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    fn chunk(id: &str) -> TextChunk {
        TextChunk {
            id: id.to_string(),
            text: "chunk text".to_string(),
            source_pdf: "doc.pdf".to_string(),
            page: 1,
            token_count: 2,
        }
    }

    #[tokio::test]
    async fn test_upsert_length_mismatch_is_a_precondition_error() {
        let index = PineconeIndex::new(&test_config()).unwrap();
        let chunks = vec![chunk("a")];
        let vectors = vec![vec![0.0], vec![1.0]];

        // Fails before any request reaches the (unroutable) host.
        let result = index.upsert(&chunks, &vectors, None).await;
        assert!(matches!(
            result,
            Err(VectorStoreError::LengthMismatch {
                chunks: 1,
                vectors: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_upsert_sends_nothing() {
        let index = PineconeIndex::new(&test_config()).unwrap();
        let count = index.upsert(&[], &[], None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_stats_deserialization() {
        let stats: IndexStats = serde_json::from_str(
            r#"{"namespaces":{},"dimension":1536,"indexFullness":0.25,"totalVectorCount":120}"#,
        )
        .unwrap();
        assert_eq!(stats.total_vectors, 120);
        assert_eq!(stats.dimension, 1536);
        assert_eq!(stats.fullness, 0.25);
    }

    #[test]
    fn test_match_with_full_metadata() {
        let m: QueryMatch = serde_json::from_str(
            r#"{"id":"doc__p3__c0__abcd1234","score":0.82,
                "metadata":{"text":"body","source_pdf":"doc.pdf","page":3.0}}"#,
        )
        .unwrap();
        let retrieved = RetrievedChunk::from(m);
        assert_eq!(retrieved.text, "body");
        assert_eq!(retrieved.source_pdf, "doc.pdf");
        assert_eq!(retrieved.page, 3);
        assert_eq!(retrieved.score, 0.82);
    }

    #[test]
    fn test_match_with_missing_metadata_degrades_gracefully() {
        let m: QueryMatch = serde_json::from_str(r#"{"id":"x","score":0.5}"#).unwrap();
        let retrieved = RetrievedChunk::from(m);
        assert_eq!(retrieved.text, "");
        assert_eq!(retrieved.source_pdf, "unknown");
        assert_eq!(retrieved.page, 0);
    }

    #[test]
    fn test_wire_vector_shape() {
        let chunks = vec![chunk("doc__p1__c0__deadbeef")];
        let vectors = vec![vec![0.1, 0.2]];
        let sparse = vec![SparseVector {
            indices: vec![7],
            values: vec![1.5],
        }];

        let wire = wire_vectors(&chunks, &vectors, Some(&sparse));
        let json = serde_json::to_value(&wire[0]).unwrap();

        assert_eq!(json["id"], "doc__p1__c0__deadbeef");
        assert_eq!(json["metadata"]["source_pdf"], "doc.pdf");
        assert_eq!(json["metadata"]["page"], 1);
        assert_eq!(json["sparseValues"]["indices"][0], 7);
    }

    #[test]
    fn test_wire_vector_omits_absent_sparse() {
        let chunks = vec![chunk("id")];
        let vectors = vec![vec![0.1]];
        let wire = wire_vectors(&chunks, &vectors, None);
        let json = serde_json::to_value(&wire[0]).unwrap();
        assert!(json.get("sparseValues").is_none());
    }
}
