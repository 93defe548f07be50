//! JSON REST API for Accolade.
//!
//! Exposes an axum [`Router`] over a [`ReviewWorkflow`] backed by any store
//! that is both a [`RecordStore`] and an [`AccountDirectory`], plus a
//! [`BlobStore`] for evidence uploads. Every route except `/health` and
//! `/auth/register` requires HTTP Basic credentials.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", accolade_api::api_router(AppState::new(store, blobs, limit)))
//! ```

pub mod accounts;
pub mod achievements;
pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;

use std::sync::Arc;

use accolade_core::{
  store::{AccountDirectory, BlobStore, RecordStore},
  workflow::ReviewWorkflow,
};
use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post, put},
};
use serde_json::{Value, json};

pub use auth::Authenticated;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, B> {
  pub workflow:         Arc<ReviewWorkflow<Arc<S>, Arc<S>>>,
  pub blobs:            Arc<B>,
  /// Largest decoded evidence file accepted, in bytes.
  pub max_upload_bytes: usize,
}

impl<S, B> Clone for AppState<S, B> {
  fn clone(&self) -> Self {
    Self {
      workflow:         self.workflow.clone(),
      blobs:            self.blobs.clone(),
      max_upload_bytes: self.max_upload_bytes,
    }
  }
}

impl<S, B> AppState<S, B>
where
  S: RecordStore + AccountDirectory,
  B: BlobStore,
{
  /// `store` serves as both record store and account directory.
  pub fn new(store: Arc<S>, blobs: Arc<B>, max_upload_bytes: usize) -> Self {
    Self {
      workflow: Arc::new(ReviewWorkflow::new(store.clone(), store)),
      blobs,
      max_upload_bytes,
    }
  }

  pub fn directory(&self) -> &Arc<S> { self.workflow.accounts() }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, B>(state: AppState<S, B>) -> Router<()>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  // Evidence arrives base64-encoded inside JSON, which inflates it by a third.
  let body_limit = state.max_upload_bytes / 3 * 4 + 64 * 1024;

  Router::new()
    .route("/health", get(health))
    // Accounts
    .route("/auth/register", post(accounts::register::<S, B>))
    .route("/auth/me", get(accounts::me))
    // Owner operations
    .route(
      "/achievements",
      get(achievements::list::<S, B>).post(achievements::create::<S, B>),
    )
    .route(
      "/achievements/{id}",
      get(achievements::get_one::<S, B>)
        .put(achievements::update::<S, B>)
        .delete(achievements::withdraw::<S, B>),
    )
    // Admin operations
    .route("/admin/achievements", get(admin::list::<S, B>))
    .route("/admin/achievements/{id}", delete(admin::remove::<S, B>))
    .route("/admin/achievements/{id}/review", put(admin::review::<S, B>))
    .route("/admin/dashboard/stats", get(admin::stats::<S, B>))
    .route("/admin/students", get(admin::students::<S, B>))
    .route("/admin/students/{id}", get(admin::student_detail::<S, B>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
