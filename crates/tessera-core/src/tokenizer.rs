//! Pluggable text segmentation
//!
//! Whitespace splitting is useless for languages written without word
//! boundaries. A [`Tokenizer`] rewrites text into space-separated segments
//! before indexing and before query splitting. Without one, raw text is used
//! as-is.

use std::fmt;

/// Segments text into space-separated tokens
pub trait Tokenizer: Send + Sync {
    /// Return `text` with token boundaries marked by whitespace
    fn tokenize(&self, text: &str) -> String;
}

/// Adapts a closure into a [`Tokenizer`]
pub struct FnTokenizer<F>(F);

impl<F> FnTokenizer<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    /// Wrap `f`
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Tokenizer for FnTokenizer<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn tokenize(&self, text: &str) -> String {
        (self.0)(text)
    }
}

impl<F> fmt::Debug for FnTokenizer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTokenizer").finish_non_exhaustive()
    }
}

/// Lower-cased text stored alongside a document for substring matching
pub fn search_text(tokenizer: Option<&dyn Tokenizer>, content: &str) -> String {
    match tokenizer {
        Some(t) => t.tokenize(content).to_lowercase(),
        None => content.to_lowercase(),
    }
}

/// Lower-cased query tokens in order, repeats kept
pub fn query_tokens(tokenizer: Option<&dyn Tokenizer>, query: &str) -> Vec<String> {
    search_text(tokenizer, query)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Distinct lower-cased query terms, in first-seen order
pub fn query_terms(tokenizer: Option<&dyn Tokenizer>, query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in query_tokens(tokenizer, query) {
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}
