//! HTTP Basic-auth extractor and standalone verifier.
//!
//! Credentials are checked against the argon2 PHC hash held by the account
//! directory.

use accolade_core::{
  account::Account,
  store::{AccountDirectory, BlobStore, RecordStore},
};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials.
pub struct Authenticated(pub Account);

/// Hash `password` into an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Split a `Basic` authorization header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Verify credentials from headers against `directory` and return the
/// matching account.
pub async fn verify_auth<D: AccountDirectory>(
  headers: &HeaderMap,
  directory: &D,
) -> Result<Account, ApiError> {
  let (username, password) = basic_credentials(headers)?;

  let Some(creds) = directory
    .credentials(username.clone())
    .await
    .map_err(|e| ApiError::Domain(e.into()))?
  else {
    tracing::debug!(%username, "login for unknown account");
    return Err(ApiError::Unauthorized);
  };

  let parsed_hash = PasswordHash::new(&creds.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| {
      tracing::debug!(%username, "wrong password");
      ApiError::Unauthorized
    })?;

  Ok(creds.account)
}

impl<S, B> FromRequestParts<AppState<S, B>> for Authenticated
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, B>,
  ) -> Result<Self, Self::Rejection> {
    let account = verify_auth(&parts.headers, state.directory()).await?;
    Ok(Authenticated(account))
  }
}
