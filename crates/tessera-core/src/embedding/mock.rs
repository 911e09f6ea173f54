//! Deterministic embedding provider for tests and demos
//!
//! Vectors are bag-of-words: every lower-cased whitespace token is hashed
//! into one of `dimensions` buckets. Texts sharing words therefore get
//! similar vectors, and an empty text gets the zero vector.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Vec<String>>,
    fail_on_calls: Vec<usize>,
    fail_on_text: Vec<String>,
    count_mismatch: bool,
}

/// In-memory provider with call recording and failure injection
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockEmbeddingProvider {
    /// Provider producing `dimensions`-long vectors
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            state: Arc::default(),
        }
    }

    /// Fail the `n`-th call (1-based)
    #[must_use]
    pub fn fail_on_call(self, n: usize) -> Self {
        self.state.lock().fail_on_calls.push(n);
        self
    }

    /// Fail any call containing a text with `needle` in it
    #[must_use]
    pub fn fail_on_text(self, needle: impl Into<String>) -> Self {
        self.state.lock().fail_on_text.push(needle.into());
        self
    }

    /// Return one vector fewer than requested
    #[must_use]
    pub fn with_count_mismatch(self) -> Self {
        self.state.lock().count_mismatch = true;
        self
    }

    /// Inputs of every call so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().calls.clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Sizes of every call so far
    pub fn call_sizes(&self) -> Vec<usize> {
        self.state.lock().calls.iter().map(Vec::len).collect()
    }

    /// The vector this provider produces for `text`
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let bucket = fnv1a(token.to_lowercase().as_bytes()) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_strings(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let count_mismatch = {
            let mut state = self.state.lock();
            state.calls.push(texts.to_vec());
            let call_number = state.calls.len();

            if state.fail_on_calls.contains(&call_number) {
                return Err(EmbeddingError::Provider(format!(
                    "injected failure on call {call_number}"
                )));
            }
            if let Some(needle) = state
                .fail_on_text
                .iter()
                .find(|needle| texts.iter().any(|t| t.contains(needle.as_str())))
            {
                return Err(EmbeddingError::Provider(format!(
                    "injected failure for text containing '{needle}'"
                )));
            }
            state.count_mismatch
        };

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if count_mismatch {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn model(&self) -> &str {
        "mock"
    }
}
