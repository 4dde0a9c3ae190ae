use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "openai/text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-oss-20b";

/// Environment variable holding the embedding service API key.
pub const EMBEDDING_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Environment variable holding the Pinecone API key.
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
/// Environment variable holding the Pinecone index data-plane host URL.
pub const PINECONE_INDEX_HOST_ENV: &str = "PINECONE_INDEX_HOST";
/// Environment variable holding the chat service API key.
pub const CHAT_API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("pdfrag").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

/// Read a required credential from the environment.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name.to_string())),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensionality produced by the model. Must match the index.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    /// Maximum texts per embedding request (service per-request limit).
    #[serde(default = "default_request_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// API key override; falls back to `OPENROUTER_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_embedding_base_url() -> String {
    DEFAULT_EMBEDDING_BASE_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_request_batch_size() -> u32 {
    100
}

fn default_timeout() -> u64 {
    120
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_request_batch_size(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Pinecone index data-plane host; falls back to `PINECONE_INDEX_HOST`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default)]
    pub namespace: String,

    /// Maximum vectors per upsert request (store per-request limit).
    #[serde(default = "default_request_batch_size")]
    pub upsert_batch_size: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// API key override; falls back to `PINECONE_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: None,
            namespace: String::new(),
            upsert_batch_size: default_request_batch_size(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Directory scanned for PDF files.
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,

    /// Target chunk size in tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in tokens.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Tokenizer vocabulary matching the embedding model.
    #[serde(default = "default_tokenizer_path")]
    pub tokenizer_path: PathBuf,

    /// Where the fitted BM25 model is persisted.
    #[serde(default = "default_bm25_model_path")]
    pub bm25_model_path: PathBuf,
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("data/pdfs")
}

fn default_chunk_size() -> u32 {
    800
}

fn default_chunk_overlap() -> u32 {
    100
}

fn default_tokenizer_path() -> PathBuf {
    PathBuf::from("data/tokenizer.json")
}

fn default_bm25_model_path() -> PathBuf {
    PathBuf::from("data/bm25_model.json")
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            tokenizer_path: default_tokenizer_path(),
            bm25_model_path: default_bm25_model_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors requested per query.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Minimum acceptable best similarity score (inclusive).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Attach BM25 sparse vectors to queries.
    #[serde(default)]
    pub hybrid: bool,
}

fn default_top_k() -> u32 {
    6
}

fn default_similarity_threshold() -> f32 {
    0.3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            hybrid: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Prior turns passed to the generator per request.
    #[serde(default = "default_max_history")]
    pub max_history: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// API key override; falls back to `GROQ_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_chat_base_url() -> String {
    DEFAULT_CHAT_BASE_URL.to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_max_history() -> u32 {
    3
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            max_history: default_max_history(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.base_url, DEFAULT_EMBEDDING_BASE_URL);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.indexing.chunk_size, 800);
        assert_eq!(config.indexing.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.retrieval.similarity_threshold, 0.3);
        assert!(!config.retrieval.hybrid);
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [indexing]
            chunk_size = 400
            "#,
        )
        .unwrap();
        assert_eq!(config.indexing.chunk_size, 400);
        assert_eq!(config.indexing.chunk_overlap, 100);
        assert_eq!(config.embedding.batch_size, 100);
    }

    #[test]
    fn test_require_env_missing() {
        let result = require_env("PDFRAG_TEST_UNSET_VARIABLE");
        assert!(matches!(result, Err(ConfigError::MissingEnv(_))));
    }
}
