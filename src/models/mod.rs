mod config;
mod document;

pub use config::{
    CHAT_API_KEY_ENV, ChatConfig, Config, DEFAULT_CHAT_BASE_URL, DEFAULT_CHAT_MODEL,
    DEFAULT_EMBEDDING_BASE_URL, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    EMBEDDING_API_KEY_ENV, EmbeddingConfig, IndexingConfig, PINECONE_API_KEY_ENV,
    PINECONE_INDEX_HOST_ENV, RetrievalConfig, VectorStoreConfig, require_env,
};
pub use document::{PageContent, PdfDocument, RetrievedChunk, TextChunk};
