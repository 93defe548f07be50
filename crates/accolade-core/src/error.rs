//! Error taxonomy shared by every Accolade crate.

use thiserror::Error;
use uuid::Uuid;

use crate::record::Status;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed, missing, or out-of-enum input.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("achievement not found: {0}")]
  NotFound(Uuid),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  /// The acting account lacks the role or ownership the operation needs.
  #[error("forbidden: {0}")]
  Forbidden(String),

  /// A mutation was attempted outside the `pending` status.
  #[error("achievement {id} is {status}; only pending achievements can be changed")]
  InvalidState { id: Uuid, status: Status },

  #[error("field {0:?} cannot be changed after creation")]
  ImmutableField(&'static str),

  /// The record changed between the caller's read and its write.
  #[error("achievement {0} was modified concurrently")]
  Conflict(Uuid),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  /// Failures of the persistence layer, passed through untouched.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
