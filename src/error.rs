//! Error types for the PDF RAG CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to configuration and credentials.
///
/// Missing credentials are fatal at client construction and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("invalid HTTP client configuration: {0}")]
    HttpClientError(String),
}

/// Errors related to loading PDF documents from disk.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("PDF directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("directory walk error: {0}")]
    WalkError(String),

    #[error("text extraction failed for {file}: {message}")]
    ExtractionError { file: String, message: String },
}

/// Errors related to tokenization and chunking.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("invalid chunking config: {0}")]
    InvalidConfig(String),
}

/// Errors related to embedding generation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("embedding service error (status {status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding count mismatch: sent {sent} texts, received {received} vectors")]
    CountMismatch { sent: usize, received: usize },
}

/// Errors related to vector index operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector index request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("vector index error (status {status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("invalid vector index response: {0}")]
    InvalidResponse(String),

    #[error("upsert precondition failed: {chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },
}

/// Errors related to the BM25 sparse encoder.
#[derive(Debug, Error)]
pub enum SparseError {
    #[error("BM25 model not fitted: {} does not exist. Run indexing first.", .0.display())]
    NotFitted(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("cannot fit BM25 encoder on an empty corpus")]
    EmptyCorpus,
}

/// Errors related to the indexing pipeline.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("loader error: {0}")]
    LoaderError(#[from] LoaderError),

    #[error("chunking error: {0}")]
    ChunkError(#[from] ChunkError),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("sparse encoder error: {0}")]
    SparseError(#[from] SparseError),
}

/// Errors related to query-time retrieval.
///
/// Insufficient evidence is not an error; it is a normal retrieval outcome
/// (see `services::retrieval::RetrievalOutcome`).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("sparse encoder error: {0}")]
    SparseError(#[from] SparseError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors related to answer generation.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("chat service error (status {status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("invalid chat response: {0}")]
    InvalidResponse(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("{0}")]
    Other(String),
}
