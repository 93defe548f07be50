//! In-memory implementations of the storage traits.
//!
//! All state is held behind `RwLock`s and lost on drop. Used by tests and by
//! anything that wants a throwaway backend.

use std::{collections::HashMap, convert::Infallible};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  Error, Result,
  account::{Account, Credentials, NewAccount, Role},
  record::{AchievementRecord, BlobRef, RecordFields, RecordPatch, Status},
  store::{AccountDirectory, BlobStore, RecordStore},
};

// ─── Records and accounts ────────────────────────────────────────────────────

/// In-memory record store and account directory.
///
/// Records are kept in insertion order so ties on `created_at` still list the
/// later submission first.
#[derive(Default)]
pub struct MemoryStore {
  records:  RwLock<Vec<AchievementRecord>>,
  accounts: RwLock<Vec<Credentials>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

fn newest_first<T>(mut items: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
  items.reverse();
  items.sort_by_key(|item| std::cmp::Reverse(created(item)));
  items
}

impl RecordStore for MemoryStore {
  type Error = Error;

  async fn create(
    &self,
    owner: Uuid,
    fields: RecordFields,
    evidence: Option<BlobRef>,
  ) -> Result<AchievementRecord> {
    let record = AchievementRecord::draft(owner, fields, evidence, Utc::now())?;
    self.records.write().await.push(record.clone());
    Ok(record)
  }

  async fn get(&self, id: Uuid) -> Result<Option<AchievementRecord>> {
    let records = self.records.read().await;
    Ok(records.iter().find(|r| r.id == id).cloned())
  }

  async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<AchievementRecord>> {
    let records = self.records.read().await;
    let owned = records.iter().filter(|r| r.owner == owner).cloned().collect();
    Ok(newest_first(owned, |r| r.created_at))
  }

  async fn list_all(&self, status: Option<Status>) -> Result<Vec<AchievementRecord>> {
    let records = self.records.read().await;
    let matching = records
      .iter()
      .filter(|r| status.is_none_or(|s| r.status == s))
      .cloned()
      .collect();
    Ok(newest_first(matching, |r| r.created_at))
  }

  async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<AchievementRecord> {
    let mut records = self.records.write().await;
    let slot = records
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or(Error::NotFound(id))?;
    let next = patch.apply_to(slot, Utc::now())?;
    *slot = next.clone();
    Ok(next)
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let mut records = self.records.write().await;
    let before = records.len();
    records.retain(|r| r.id != id);
    if records.len() == before {
      return Err(Error::NotFound(id));
    }
    Ok(())
  }

  async fn count(&self, status: Option<Status>) -> Result<u64> {
    let records = self.records.read().await;
    Ok(
      records
        .iter()
        .filter(|r| status.is_none_or(|s| r.status == s))
        .count() as u64,
    )
  }
}

impl AccountDirectory for MemoryStore {
  type Error = Error;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
    let accounts = self.accounts.read().await;
    Ok(
      accounts
        .iter()
        .find(|c| c.account.id == id)
        .map(|c| c.account.clone()),
    )
  }

  async fn find_by_username(&self, username: String) -> Result<Option<Account>> {
    Ok(self.credentials(username).await?.map(|c| c.account))
  }

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let mut accounts = self.accounts.write().await;
    if accounts.iter().any(|c| c.account.username == input.username) {
      return Err(Error::UsernameTaken(input.username));
    }
    let account = Account {
      id:         Uuid::new_v4(),
      username:   input.username,
      role:       input.role,
      profile:    input.profile,
      created_at: Utc::now(),
    };
    accounts.push(Credentials {
      account:       account.clone(),
      password_hash: input.password_hash,
    });
    Ok(account)
  }

  async fn credentials(&self, username: String) -> Result<Option<Credentials>> {
    let accounts = self.accounts.read().await;
    Ok(accounts.iter().find(|c| c.account.username == username).cloned())
  }

  async fn count_by_role(&self, role: Role) -> Result<u64> {
    let accounts = self.accounts.read().await;
    Ok(accounts.iter().filter(|c| c.account.role == role).count() as u64)
  }

  async fn list_by_role(&self, role: Role) -> Result<Vec<Account>> {
    let accounts = self.accounts.read().await;
    let matching = accounts
      .iter()
      .filter(|c| c.account.role == role)
      .map(|c| c.account.clone())
      .collect();
    Ok(newest_first(matching, |a| a.created_at))
  }
}

// ─── Blobs ───────────────────────────────────────────────────────────────────

/// A stored blob: raw bytes plus the uploader's content-type hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
  pub bytes:        Vec<u8>,
  pub content_type: Option<String>,
}

/// In-memory [`BlobStore`].
#[derive(Default)]
pub struct MemoryBlobStore {
  blobs: RwLock<HashMap<BlobRef, StoredBlob>>,
}

impl MemoryBlobStore {
  pub fn new() -> Self { Self::default() }

  pub async fn get(&self, reference: &BlobRef) -> Option<StoredBlob> {
    self.blobs.read().await.get(reference).cloned()
  }
}

impl BlobStore for MemoryBlobStore {
  type Error = Infallible;

  async fn store(
    &self,
    bytes: Vec<u8>,
    content_type_hint: Option<String>,
  ) -> Result<BlobRef, Infallible> {
    let reference = BlobRef(format!("mem-{}", Uuid::new_v4().simple()));
    self.blobs.write().await.insert(
      reference.clone(),
      StoredBlob { bytes, content_type: content_type_hint },
    );
    Ok(reference)
  }
}
