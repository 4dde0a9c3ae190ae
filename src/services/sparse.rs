//! BM25 sparse encoder for hybrid search.
//!
//! Fitted on the chunk corpus during indexing and persisted as JSON; at query
//! time the fitted model is loaded lazily through [`SparseEncoderCache`] and
//! kept in memory for the cache's lifetime. Sparse vectors complement the
//! dense embeddings with keyword-level signal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SparseError;
use crate::services::vector_store::SparseVector;

const DEFAULT_K1: f32 = 1.2;
const DEFAULT_B: f32 = 0.75;

/// A fitted BM25 model over the chunk corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Encoder {
    k1: f32,
    b: f32,
    doc_count: u32,
    avg_doc_len: f32,
    /// Per-token document frequency over the fitted corpus.
    doc_freq: HashMap<String, u32>,
    pub fitted_at: DateTime<Utc>,
}

impl Bm25Encoder {
    /// Fit the encoder on the corpus of chunk texts.
    pub fn fit(texts: &[String]) -> Result<Self, SparseError> {
        if texts.is_empty() {
            return Err(SparseError::EmptyCorpus);
        }

        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0usize;

        for text in texts {
            let tokens = tokenize(text);
            total_len += tokens.len();
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
        }

        Ok(Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
            doc_count: texts.len() as u32,
            avg_doc_len: total_len as f32 / texts.len() as f32,
            doc_freq,
            fitted_at: Utc::now(),
        })
    }

    /// Persist the fitted model as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SparseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously fitted model. Absence of the file means indexing has
    /// never run, which is fatal for callers that need sparse encoding.
    pub fn load(path: &Path) -> Result<Self, SparseError> {
        if !path.exists() {
            return Err(SparseError::NotFitted(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Encode a document text: term-frequency weights normalized by document
    /// length against the corpus average.
    pub fn encode_document(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        let doc_len = tokens.len() as f32;

        let mut tf: HashMap<&String, u32> = HashMap::new();
        for token in &tokens {
            *tf.entry(token).or_insert(0) += 1;
        }

        let norm = self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_len);
        let mut weights = BTreeMap::new();
        for (token, count) in tf {
            let count = count as f32;
            let value = count * (self.k1 + 1.0) / (count + norm);
            *weights.entry(term_index(token)).or_insert(0.0) += value;
        }

        into_sparse(weights)
    }

    /// Encode a query text: inverse-document-frequency weights, so rare
    /// corpus terms dominate the sparse match.
    pub fn encode_query(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        let n = self.doc_count as f32;

        let mut weights = BTreeMap::new();
        let unique: HashSet<&String> = tokens.iter().collect();
        for token in unique {
            let df = self.doc_freq.get(token).copied().unwrap_or(0) as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            *weights.entry(term_index(token)).or_insert(0.0) += idf;
        }

        into_sparse(weights)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

/// Map a token to a stable u32 index (first four bytes of its SHA-256).
fn term_index(token: &str) -> u32 {
    let digest = Sha256::digest(token.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

fn into_sparse(weights: BTreeMap<u32, f32>) -> SparseVector {
    let (indices, values) = weights.into_iter().unzip();
    SparseVector { indices, values }
}

/// Explicit cache for the fitted encoder: load once on first use, keep for
/// the cache object's lifetime. Owned by whichever component needs sparse
/// encoding instead of living in hidden process-wide state.
pub struct SparseEncoderCache {
    path: PathBuf,
    cached: Mutex<Option<Arc<Bm25Encoder>>>,
}

impl SparseEncoderCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the fitted encoder, loading it from disk on first use.
    pub fn get_or_load(&self) -> Result<Arc<Bm25Encoder>, SparseError> {
        let mut cached = self.cached.lock().unwrap();
        if let Some(encoder) = cached.as_ref() {
            return Ok(Arc::clone(encoder));
        }
        let encoder = Arc::new(Bm25Encoder::load(&self.path)?);
        *cached = Some(Arc::clone(&encoder));
        Ok(encoder)
    }

    /// Prime the cache with a freshly fitted encoder (after indexing).
    pub fn replace(&self, encoder: Bm25Encoder) -> Arc<Bm25Encoder> {
        let encoder = Arc::new(encoder);
        *self.cached.lock().unwrap() = Some(Arc::clone(&encoder));
        encoder
    }
}
