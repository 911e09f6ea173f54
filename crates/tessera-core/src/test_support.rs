//! Deterministic collaborators for tests and demos
//!
//! Everything here is also reachable through its home module; this is just a
//! single import point for test code.

pub use crate::clock::ManualClock;
pub use crate::embedding::mock::MockEmbeddingProvider;
pub use crate::tokenizer::FnTokenizer;
