//! Core abstractions for tessera
//!
//! This crate defines the domain types and collaborator traits shared by the
//! storage backend, plus the pure pieces of retrieval logic that do not need
//! a database:
//!
//! - [`types`] - documents, triples, query results, retrieval modes
//! - [`embedding`] - the embedding provider trait and implementations
//! - [`tokenizer`] - pluggable query/content segmentation
//! - [`similarity`] - cosine similarity and vector (de)serialization
//! - [`fusion`] - weighted score fusion for hybrid retrieval
//! - [`retry`] / [`clock`] / [`rate_limit`] - contention retry, injectable time, token bucket
//! - [`test_support`] - mock embedder, manual clock, closure tokenizer
//!
//! Storage implementations (see `tessera-sqlite`) depend on this crate, never
//! the other way around.

pub mod clock;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod rate_limit;
pub mod retry;
pub mod similarity;
pub mod test_support;
pub mod tokenizer;
pub mod types;

pub use clock::{Clock, ManualClock, TokioClock};
pub use embedding::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
pub use error::{GraphError, TesseraError, TesseraResult};
pub use fusion::{fuse, FusionWeights};
pub use rate_limit::RateLimiter;
pub use retry::{RetryPolicy, Transient};
pub use similarity::cosine_similarity;
pub use tokenizer::{FnTokenizer, Tokenizer};
pub use types::{
    Document, DocumentInput, EmbeddingStatus, QueryResult, RetrievalMode, Triple,
    SELF_LINK_PREDICATE,
};

pub use tokio_util::sync::CancellationToken;
