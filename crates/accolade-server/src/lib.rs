//! The Accolade HTTP server: configuration, the filesystem blob store, and
//! the top-level router that mounts the JSON API under `/api`.

pub mod blob;

use std::path::{Path, PathBuf};

use accolade_api::{AppState, api_router};
use accolade_core::store::{AccountDirectory, BlobStore, RecordStore};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ACCOLADE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// Directory evidence files are written to.
  #[serde(default = "default_upload_dir")]
  pub upload_dir:       PathBuf,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/accolade/accolade.db") }

fn default_upload_dir() -> PathBuf { PathBuf::from("~/.local/share/accolade/uploads") }

fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the API under `/api`, wrapped in request tracing.
pub fn app<S, B>(state: AppState<S, B>) -> Router
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
