//! Embedding client for an OpenAI-compatible embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EmbeddingError};
use crate::models::{EMBEDDING_API_KEY_ENV, EmbeddingConfig, require_env};

/// Turns texts into fixed-dimension dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a list of texts, returning vectors in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query text (one item, not batched).
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for the embedding service (OpenRouter by default).
pub struct EmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl EmbeddingClient {
    /// Create a new embedding client. Missing credentials fail here, before
    /// any request is made.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => require_env(EMBEDDING_API_KEY_ENV)?,
        };

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
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
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size as usize,
        })
    }

    async fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServiceError { status, message });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let ordered = into_input_order(parsed.data, texts.len())?;

        if let Some(vector) = ordered.first()
            && vector.len() != self.dimension
        {
            return Err(EmbeddingError::InvalidResponse(format!(
                "service returned dimension {} but index expects {}",
                vector.len(),
                self.dimension
            )));
        }

        Ok(ordered)
    }
}

/// Re-sort one batch's results by the service-provided index so the batch
/// comes back in input order regardless of how the service ordered it.
fn into_input_order(
    mut data: Vec<EmbeddingData>,
    sent: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != sent {
        return Err(EmbeddingError::CountMismatch {
            sent,
            received: data.len(),
        });
    }
    data.sort_by_key(|entry| entry.index);
    Ok(data.into_iter().map(|entry| entry.embedding).collect())
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.embed_single_batch(batch).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = [text.to_string()];
        let mut embeddings = self.embed_single_batch(&input).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation_with_configured_key() {
        let client = EmbeddingClient::new(&config_with_key());
        assert!(client.is_ok());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = EmbeddingConfig {
            base_url: "https://openrouter.ai/api/v1/".to_string(),
            ..config_with_key()
        };
        let client = EmbeddingClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "https://openrouter.ai/api/v1/embeddings");
    }

    #[test]
    fn test_out_of_order_results_are_restored() {
        let data = vec![
            EmbeddingData {
                index: 2,
                embedding: vec![2.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![0.0],
            },
            EmbeddingData {
                index: 1,
                embedding: vec![1.0],
            },
        ];

        let ordered = into_input_order(data, 3).unwrap();
        assert_eq!(ordered, vec![vec![0.0], vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        let data = vec![EmbeddingData {
            index: 0,
            embedding: vec![0.0],
        }];
        let result = into_input_order(data, 2);
        assert!(matches!(
            result,
            Err(EmbeddingError::CountMismatch {
                sent: 2,
                received: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        // The endpoint is unroutable; an empty input must still succeed
        // because no network call is made.
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..config_with_key()
        };
        let client = EmbeddingClient::new(&config).unwrap();
        let result = client.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
