//! # Tessera Configuration
//!
//! Type-safe configuration for the tessera retrieval backend. Every section
//! has sensible defaults and `#[serde(default)]`, so a partial TOML file (or
//! none at all) yields a working configuration.
//!
//! ```rust
//! use tessera_config::TesseraConfig;
//!
//! let config = TesseraConfig::from_toml_str(
//!     r#"
//!     [ingestion]
//!     batch_size = 32
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.ingestion.batch_size, 32);
//! assert_eq!(config.retrieval.vector_weight, 0.6);
//! ```

#![warn(missing_docs)]

pub mod components;
mod config;
mod identifier;

pub use components::*;
pub use config::{ConfigError, ConfigResult, TesseraConfig};
pub use identifier::{validate_identifier, SqlIdentifier};
