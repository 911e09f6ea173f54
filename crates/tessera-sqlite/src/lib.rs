//! SQLite storage backend for tessera
//!
//! Everything that touches the database lives here: the connection wrapper,
//! the triple store and its traversal/path search, the document store, the
//! ingestion pipeline, the three search indexes, the hybrid retriever, and
//! the [`RagStore`] facade that ties them together.
//!
//! ## Features
//!
//! - **Triple store**: idempotent `link`/`unlink` with backoff on lock
//!   contention, neighbor queries, a chainable traversal builder, BFS paths
//! - **Ingestion**: chunked inline embedding, or `pending` rows drained
//!   through a rate limiter
//! - **Retrieval**: vector (a registered `cosine_similarity` SQL function),
//!   substring full-text, graph expansion, and weighted hybrid fusion
//! - **Thread Safety**: Arc<Mutex<Connection>>, queries on tokio's blocking pool
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_config::TesseraConfig;
//! use tessera_sqlite::RagStore;
//!
//! let store = RagStore::from_config(TesseraConfig::load("tessera.toml")?)?;
//! store.store(documents).await?;
//! let outcome = store.retrieve("borrow checker", Some("hybrid"), 5).await?;
//! ```

pub mod connection;
pub mod document_store;
pub mod error;
pub mod graph;
pub mod index;
pub mod ingestion;
pub mod rag_store;
pub mod retriever;
pub mod schema;
mod timestamp;

// Re-exports
pub use connection::SqlitePool;
pub use document_store::{DocumentStore, DocumentWrite, StatusCounts, TextMatch};
pub use error::{SqliteError, SqliteResult};
pub use graph::{Direction, NodeId, NodeInterner, Traversal, TripleStore, MAX_PATHS};
pub use index::{FulltextIndex, GraphIndex, VectorIndex};
pub use ingestion::{DrainReport, IngestionPipeline};
pub use rag_store::{Components, RagStore};
pub use retriever::{HybridRetriever, PartialFailure, RetrievalOutcome};
pub use schema::TableNames;
