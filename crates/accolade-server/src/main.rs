//! accolade-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `ACCOLADE_*` environment variables, opens the SQLite store and the upload
//! directory, and serves the JSON API under `/api`.
//!
//! # First administrator
//!
//! Registration only ever creates students. Create an admin with:
//!
//! ```
//! cargo run -p accolade-server -- --create-admin root
//! ```

use std::{path::PathBuf, sync::Arc};

use accolade_api::{AppState, accounts::validate_username, auth::hash_password};
use accolade_core::{
  account::{NewAccount, Profile, Role},
  store::AccountDirectory,
};
use accolade_server::{ServerConfig, blob::FsBlobStore, expand_tilde};
use accolade_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Accolade achievement review server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an administrator account with this username (password read from
  /// stdin) and exit.
  #[arg(long, value_name = "USERNAME")]
  create_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ACCOLADE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: create an administrator and exit.
  if let Some(username) = cli.create_admin {
    let username = validate_username(&username)?;
    let password = read_password()?;
    if password.is_empty() {
      anyhow::bail!("password must not be empty");
    }
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    let account = store
      .create_account(NewAccount {
        username,
        password_hash: hash,
        role: Role::Admin,
        profile: Profile::default(),
      })
      .await
      .context("failed to create administrator")?;
    tracing::info!(account_id = %account.id, username = %account.username, "administrator created");
    return Ok(());
  }

  let upload_dir = expand_tilde(&server_cfg.upload_dir);
  let blobs = FsBlobStore::open(&upload_dir)
    .await
    .with_context(|| format!("failed to open upload directory {upload_dir:?}"))?;

  let state = AppState::new(Arc::new(store), Arc::new(blobs), server_cfg.max_upload_bytes);

  let app = accolade_server::app(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
