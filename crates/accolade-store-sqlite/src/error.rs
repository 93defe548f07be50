//! Error type for `accolade-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain failure (validation, not found, conflict, ...).
  #[error(transparent)]
  Core(#[from] accolade_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be turned back into a domain value.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain failures pass through unchanged; everything else is a storage
/// failure.
impl From<Error> for accolade_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(inner) => inner,
      other => accolade_core::Error::Storage(Box::new(other)),
    }
  }
}
