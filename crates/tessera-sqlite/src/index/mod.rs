//! The three retrieval strategies
//!
//! Each index reads the document store independently and produces scored
//! [`QueryResult`](tessera_core::QueryResult)s; fusion happens in the
//! retriever.

mod fulltext;
mod graph;
mod vector;

pub use fulltext::FulltextIndex;
pub use graph::GraphIndex;
pub use vector::VectorIndex;
