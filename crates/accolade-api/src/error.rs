//! API error type and [`axum::response::IntoResponse`] implementation.

use accolade_core::Error;
use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or wrong credentials.
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request could not be extracted: malformed JSON, a bad path
  /// segment, or an unparsable query string.
  #[error("{message}")]
  Rejected { status: StatusCode, message: String },

  #[error("evidence exceeds the {limit}-byte upload limit")]
  PayloadTooLarge { limit: usize },

  #[error(transparent)]
  Domain(#[from] Error),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Rejected { status, .. } => *status,
      ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Domain(e) => match e {
        Error::Validation(_) | Error::ImmutableField(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) | Error::AccountNotFound(_) => StatusCode::NOT_FOUND,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::InvalidState { .. } | Error::UsernameTaken(_) => StatusCode::CONFLICT,
        Error::Conflict(_) => StatusCode::PRECONDITION_FAILED,
        Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
      "internal server error".to_owned()
    } else {
      self.to_string()
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"accolade\""),
      );
    }
    res
  }
}
