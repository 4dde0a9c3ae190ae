mod chat;
mod chunker;
mod embedding;
mod indexer;
mod loader;
mod retrieval;
mod sparse;
pub mod tokenizer;
mod vector_store;

pub use chat::{ChatClient, ChatTurn, NO_EVIDENCE_REPLY, Role};
pub use chunker::TextChunker;
pub use embedding::{Embedder, EmbeddingClient};
pub use indexer::{IndexOutcome, IndexReport, IndexingPipeline};
pub use loader::{LoadOutcome, PdfLoader};
pub use retrieval::{Citation, GroundedContext, RetrievalGate, RetrievalOutcome};
pub use sparse::{Bm25Encoder, SparseEncoderCache};
pub use tokenizer::{HfTokenCodec, TokenCodec};
pub use vector_store::{IndexStats, PineconeIndex, SparseVector, VectorIndex};
