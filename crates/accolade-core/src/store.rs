//! Storage abstractions: the record store, the account directory, and the
//! blob store.
//!
//! Backends (e.g. `accolade-store-sqlite`, [`crate::memory`]) implement these
//! traits. The workflow and the HTTP layer depend on the abstractions, not on
//! any concrete backend.
//!
//! Backend errors must convert into [`crate::Error`]: domain failures
//! (validation, not found, conflicts) come through as themselves and anything
//! else lands in [`crate::Error::Storage`].

use std::{future::Future, sync::Arc};

use uuid::Uuid;

use crate::{
  account::{Account, Credentials, NewAccount, Role},
  record::{AchievementRecord, BlobRef, RecordFields, RecordPatch, Status},
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// Durable storage for [`AchievementRecord`]s.
///
/// The store performs field validation but no permission checks; callers
/// (the [`crate::workflow::ReviewWorkflow`]) gate every mutation.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Validate `fields` and persist a new pending record owned by `owner`.
  fn create(
    &self,
    owner: Uuid,
    fields: RecordFields,
    evidence: Option<BlobRef>,
  ) -> impl Future<Output = Result<AchievementRecord, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementRecord>, Self::Error>> + Send + '_;

  /// All records owned by `owner`, most recently created first.
  fn list_by_owner(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<AchievementRecord>, Self::Error>> + Send + '_;

  /// All records, most recently created first, optionally restricted to one
  /// status.
  fn list_all(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<AchievementRecord>, Self::Error>> + Send + '_;

  /// Apply `patch` to the stored record and return the result.
  ///
  /// Fails with not-found for an unknown id, with an immutable-field error if
  /// the patch would change `owner` or `created_at`, and with a conflict if
  /// `patch.expected_updated_at` is stale. Nothing is written on failure.
  fn update(
    &self,
    id: Uuid,
    patch: RecordPatch,
  ) -> impl Future<Output = Result<AchievementRecord, Self::Error>> + Send + '_;

  /// Hard-delete a record. Fails with not-found if absent.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of records, optionally restricted to one status.
  fn count(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// The account directory. Authentication happens outside the core; this trait
/// only stores and looks up accounts.
pub trait AccountDirectory: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  fn find_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn find_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Persist a new account. Fails if the username is taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// The account and its stored password hash, for credential checks.
  fn credentials(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  fn count_by_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Accounts with `role`, most recently created first.
  fn list_by_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;
}

// ─── Blobs ───────────────────────────────────────────────────────────────────

/// Storage for uploaded evidence files.
///
/// Only the returned [`BlobRef`] is ever persisted alongside a record. Size
/// and type filtering are deployment policy, not part of this contract.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn store(
    &self,
    bytes: Vec<u8>,
    content_type_hint: Option<String>,
  ) -> impl Future<Output = Result<BlobRef, Self::Error>> + Send + '_;
}

// ─── Shared handles ──────────────────────────────────────────────────────────

// A single backend usually serves as both record store and account directory;
// these impls let one `Arc` fill both roles.

impl<T: RecordStore> RecordStore for Arc<T> {
  type Error = T::Error;

  fn create(
    &self,
    owner: Uuid,
    fields: RecordFields,
    evidence: Option<BlobRef>,
  ) -> impl Future<Output = Result<AchievementRecord, Self::Error>> + Send + '_ {
    (**self).create(owner, fields, evidence)
  }

  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementRecord>, Self::Error>> + Send + '_ {
    (**self).get(id)
  }

  fn list_by_owner(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<AchievementRecord>, Self::Error>> + Send + '_ {
    (**self).list_by_owner(owner)
  }

  fn list_all(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<AchievementRecord>, Self::Error>> + Send + '_ {
    (**self).list_all(status)
  }

  fn update(
    &self,
    id: Uuid,
    patch: RecordPatch,
  ) -> impl Future<Output = Result<AchievementRecord, Self::Error>> + Send + '_ {
    (**self).update(id, patch)
  }

  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    (**self).delete(id)
  }

  fn count(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_ {
    (**self).count(status)
  }
}

impl<T: AccountDirectory> AccountDirectory for Arc<T> {
  type Error = T::Error;

  fn find_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_ {
    (**self).find_by_id(id)
  }

  fn find_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_ {
    (**self).find_by_username(username)
  }

  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_ {
    (**self).create_account(input)
  }

  fn credentials(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_ {
    (**self).credentials(username)
  }

  fn count_by_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_ {
    (**self).count_by_role(role)
  }

  fn list_by_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_ {
    (**self).list_by_role(role)
  }
}

impl<T: BlobStore> BlobStore for Arc<T> {
  type Error = T::Error;

  fn store(
    &self,
    bytes: Vec<u8>,
    content_type_hint: Option<String>,
  ) -> impl Future<Output = Result<BlobRef, Self::Error>> + Send + '_ {
    (**self).store(bytes, content_type_hint)
  }
}
