//! Error types for treadle-core

use thiserror::Error;

/// Errors that can occur while persisting or reloading a store
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialize error: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("parse error: {0}")]
  Parse(#[source] serde_json::Error),
}
