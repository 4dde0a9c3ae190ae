//! Tokenizer seam used for chunk-size accounting.
//!
//! The whole corpus is measured with one fixed tokenizer so chunk-size and
//! overlap settings stay comparable across documents. Production loads the
//! vocabulary file matching the embedding model; tests substitute small
//! in-memory codecs.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::ChunkError;

/// Encode text to token ids and decode a window of ids back to text.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ChunkError>;
    fn decode(&self, ids: &[u32]) -> Result<String, ChunkError>;

    fn count(&self, text: &str) -> Result<usize, ChunkError> {
        Ok(self.encode(text)?.len())
    }
}

/// HuggingFace tokenizer backed codec.
pub struct HfTokenCodec {
    tokenizer: Tokenizer,
}

impl HfTokenCodec {
    /// Load a tokenizer vocabulary from a `tokenizer.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ChunkError> {
        if !path.exists() {
            return Err(ChunkError::TokenizerError(format!(
                "tokenizer file not found: {}",
                path.display()
            )));
        }
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| ChunkError::TokenizerError(e.to_string()))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCodec for HfTokenCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ChunkError> {
        // Special tokens excluded: counts must reflect the raw text.
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| ChunkError::TokenizerError(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, ChunkError> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| ChunkError::TokenizerError(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::TokenCodec;
    use crate::error::ChunkError;

    /// Word-level codec for tests: each whitespace-separated word is one
    /// token, interned on first sight. Decoding joins words with spaces and
    /// renders the `~` placeholder word as nothing, which lets tests exercise
    /// the empty-window-skip rule.
    #[derive(Default)]
    pub struct WordCodec {
        vocab: Mutex<(HashMap<String, u32>, Vec<String>)>,
    }

    impl TokenCodec for WordCodec {
        fn encode(&self, text: &str) -> Result<Vec<u32>, ChunkError> {
            let mut vocab = self.vocab.lock().unwrap();
            let mut ids = Vec::new();
            for word in text.split_whitespace() {
                let id = match vocab.0.get(word) {
                    Some(id) => *id,
                    None => {
                        let id = vocab.1.len() as u32;
                        vocab.0.insert(word.to_string(), id);
                        vocab.1.push(word.to_string());
                        id
                    }
                };
                ids.push(id);
            }
            Ok(ids)
        }

        fn decode(&self, ids: &[u32]) -> Result<String, ChunkError> {
            let vocab = self.vocab.lock().unwrap();
            let words: Vec<&str> = ids
                .iter()
                .map(|id| vocab.1[*id as usize].as_str())
                .filter(|word| *word != "~")
                .collect();
            Ok(words.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::WordCodec;
    use super::*;

    #[test]
    fn test_word_codec_round_trip() {
        let codec = WordCodec::default();
        let ids = codec.encode("alpha beta gamma").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(codec.decode(&ids).unwrap(), "alpha beta gamma");
    }

    #[test]
    fn test_word_codec_count() {
        let codec = WordCodec::default();
        assert_eq!(codec.count("one two three four").unwrap(), 4);
        assert_eq!(codec.count("").unwrap(), 0);
    }

    #[test]
    fn test_missing_tokenizer_file() {
        let result = HfTokenCodec::from_file(Path::new("/nonexistent/tokenizer.json"));
        assert!(matches!(result, Err(ChunkError::TokenizerError(_))));
    }
}
