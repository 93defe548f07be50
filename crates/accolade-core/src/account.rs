//! Accounts — the actors that submit and review achievements.
//!
//! Accounts are owned by an external directory (see
//! [`crate::store::AccountDirectory`]); records only reference them by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// What an account is allowed to do.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Student,
  Admin,
}

/// Optional descriptive fields carried over from student registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub full_name:           Option<String>,
  pub email:               Option<String>,
  pub registration_number: Option<String>,
  pub department:          Option<String>,
}

/// A directory entry. The password hash never travels on this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub id:         Uuid,
  pub username:   String,
  pub role:       Role,
  #[serde(default)]
  pub profile:    Profile,
  pub created_at: DateTime<Utc>,
}

impl Account {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Input to [`crate::store::AccountDirectory::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username:      String,
  /// Argon2 PHC string; hashing is the caller's job.
  pub password_hash: String,
  pub role:          Role,
  pub profile:       Profile,
}

/// An account together with its stored password hash, for authentication.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub account:       Account,
  pub password_hash: String,
}
