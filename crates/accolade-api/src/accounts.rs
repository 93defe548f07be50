//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Public; always creates a student account |
//! | `GET`  | `/auth/me` | The authenticated account |

use accolade_core::{
  Error,
  account::{Account, NewAccount, Profile, Role},
  store::{AccountDirectory, BlobStore, RecordStore},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authenticated, hash_password},
  error::ApiError,
  extract::ApiJson,
};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username:            String,
  pub password:            String,
  pub full_name:           Option<String>,
  pub email:               Option<String>,
  pub registration_number: Option<String>,
  pub department:          Option<String>,
}

/// Trim `raw` and check it can be used as a login. HTTP Basic splits the
/// credentials at the first `:`, so usernames may not contain one.
pub fn validate_username(raw: &str) -> Result<String, Error> {
  let username = raw.trim();
  if username.is_empty() {
    return Err(Error::Validation("username is required".into()));
  }
  if username.contains(':') {
    return Err(Error::Validation("username may not contain ':'".into()));
  }
  Ok(username.to_owned())
}

/// `POST /auth/register` — body: `{"username":"…","password":"…"}` plus
/// optional profile fields. Any role the client sends is ignored.
pub async fn register<S, B>(
  State(state): State<AppState<S, B>>,
  ApiJson(body): ApiJson<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  let username = validate_username(&body.username)?;
  if body.password.is_empty() {
    return Err(Error::Validation("password is required".into()).into());
  }

  let password_hash = hash_password(&body.password)
    .map_err(|e| Error::Storage(format!("password hashing failed: {e}").into()))?;

  let account = state
    .directory()
    .create_account(NewAccount {
      username,
      password_hash,
      role: Role::Student,
      profile: Profile {
        full_name:           body.full_name,
        email:               body.email,
        registration_number: body.registration_number,
        department:          body.department,
      },
    })
    .await
    .map_err(|e| ApiError::Domain(e.into()))?;

  tracing::info!(account_id = %account.id, username = %account.username, "student registered");
  Ok((StatusCode::CREATED, Json(account)))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me(Authenticated(account): Authenticated) -> Json<Account> { Json(account) }
