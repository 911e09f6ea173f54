//! Configuration components, one per subsystem.

pub mod embedding;
pub mod ingestion;
pub mod retrieval;
pub mod retry;
pub mod storage;

pub use embedding::*;
pub use ingestion::*;
pub use retrieval::*;
pub use retry::*;
pub use storage::*;
