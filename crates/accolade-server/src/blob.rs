//! [`FsBlobStore`] — evidence files on the local filesystem.
//!
//! Files are content-addressed: the name is the SHA-256 of the bytes plus an
//! extension derived from the uploader's content type, so storing the same
//! file twice yields the same reference and a single file on disk.

use std::{
  io,
  path::{Path, PathBuf},
};

use accolade_core::{record::BlobRef, store::BlobStore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  /// Use `root` as the upload directory, creating it if needed.
  pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
    let root = root.as_ref().to_path_buf();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root })
  }

  /// Where the file behind `reference` lives.
  pub fn path_of(&self, reference: &BlobRef) -> PathBuf { self.root.join(reference.as_str()) }
}

/// File extension for a content type; unknown types get none.
fn extension_for(content_type: Option<&str>) -> Option<&'static str> {
  let essence = content_type?.split(';').next()?.trim().to_ascii_lowercase();
  match essence.as_str() {
    "application/pdf" => Some("pdf"),
    "image/jpeg" | "image/jpg" => Some("jpg"),
    "image/png" => Some("png"),
    "image/gif" => Some("gif"),
    "image/webp" => Some("webp"),
    "text/plain" => Some("txt"),
    _ => None,
  }
}

impl BlobStore for FsBlobStore {
  type Error = io::Error;

  async fn store(
    &self,
    bytes: Vec<u8>,
    content_type_hint: Option<String>,
  ) -> io::Result<BlobRef> {
    let digest = hex::encode(Sha256::digest(&bytes));
    let name = match extension_for(content_type_hint.as_deref()) {
      Some(ext) => format!("{digest}.{ext}"),
      None => digest,
    };
    let path = self.root.join(&name);

    if !tokio::fs::try_exists(&path).await? {
      // Rename into place; a reference never names a partial file. Each call
      // writes its own partial so concurrent uploads of one file don't collide.
      let partial = self
        .root
        .join(format!("{name}.{}.partial", Uuid::new_v4().simple()));
      tokio::fs::write(&partial, &bytes).await?;
      if let Err(e) = tokio::fs::rename(&partial, &path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        if !tokio::fs::try_exists(&path).await? {
          return Err(e);
        }
      }
      tracing::debug!(%name, size = bytes.len(), "wrote evidence file");
    }

    Ok(BlobRef(name))
  }
}
