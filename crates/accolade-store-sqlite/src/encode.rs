//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings, dates as
//! `YYYY-MM-DD`, UUIDs as hyphenated lowercase strings, and enums as their
//! lowercase wire names.

use std::str::FromStr;

use accolade_core::{
  account::{Account, Credentials, Profile},
  record::{AchievementRecord, BlobRef},
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

/// Decode any of the core enums from its stored wire name.
pub fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {column}: {s:?}")))
}

// ─── Achievement rows ────────────────────────────────────────────────────────

/// Column list shared by every achievement `SELECT`; matches
/// [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "achievement_id, owner_id, title, description, kind, level, \
   position, organizer, occurred_on, evidence_ref, status, reviewed_by, reviewed_at, remarks, \
   created_at, updated_at";

/// Raw strings read directly from an `achievements` row.
pub struct RawRecord {
  pub achievement_id: String,
  pub owner_id:       String,
  pub title:          String,
  pub description:    String,
  pub kind:           String,
  pub level:          String,
  pub position:       String,
  pub organizer:      String,
  pub occurred_on:    String,
  pub evidence_ref:   Option<String>,
  pub status:         String,
  pub reviewed_by:    Option<String>,
  pub reviewed_at:    Option<String>,
  pub remarks:        Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      achievement_id: row.get(0)?,
      owner_id:       row.get(1)?,
      title:          row.get(2)?,
      description:    row.get(3)?,
      kind:           row.get(4)?,
      level:          row.get(5)?,
      position:       row.get(6)?,
      organizer:      row.get(7)?,
      occurred_on:    row.get(8)?,
      evidence_ref:   row.get(9)?,
      status:         row.get(10)?,
      reviewed_by:    row.get(11)?,
      reviewed_at:    row.get(12)?,
      remarks:        row.get(13)?,
      created_at:     row.get(14)?,
      updated_at:     row.get(15)?,
    })
  }

  pub fn into_record(self) -> Result<AchievementRecord> {
    Ok(AchievementRecord {
      id:          decode_uuid(&self.achievement_id)?,
      owner:       decode_uuid(&self.owner_id)?,
      title:       self.title,
      description: self.description,
      kind:        decode_enum("kind", &self.kind)?,
      level:       decode_enum("level", &self.level)?,
      position:    decode_enum("position", &self.position)?,
      organizer:   self.organizer,
      occurred_on: decode_date(&self.occurred_on)?,
      evidence:    self.evidence_ref.map(BlobRef),
      status:      decode_enum("status", &self.status)?,
      reviewed_by: self.reviewed_by.as_deref().map(decode_uuid).transpose()?,
      reviewed_at: self.reviewed_at.as_deref().map(decode_dt).transpose()?,
      remarks:     self.remarks,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Owned column values for writing a whole record; built on the async side so
/// the closure handed to the database thread only moves plain strings.
pub struct RecordParams {
  pub achievement_id: String,
  pub owner_id:       String,
  pub title:          String,
  pub description:    String,
  pub kind:           String,
  pub level:          String,
  pub position:       String,
  pub organizer:      String,
  pub occurred_on:    String,
  pub evidence_ref:   Option<String>,
  pub status:         String,
  pub reviewed_by:    Option<String>,
  pub reviewed_at:    Option<String>,
  pub remarks:        Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl From<&AchievementRecord> for RecordParams {
  fn from(r: &AchievementRecord) -> Self {
    Self {
      achievement_id: encode_uuid(r.id),
      owner_id:       encode_uuid(r.owner),
      title:          r.title.clone(),
      description:    r.description.clone(),
      kind:           r.kind.as_ref().to_owned(),
      level:          r.level.as_ref().to_owned(),
      position:       r.position.as_ref().to_owned(),
      organizer:      r.organizer.clone(),
      occurred_on:    encode_date(r.occurred_on),
      evidence_ref:   r.evidence.as_ref().map(|b| b.as_str().to_owned()),
      status:         r.status.as_ref().to_owned(),
      reviewed_by:    r.reviewed_by.map(encode_uuid),
      reviewed_at:    r.reviewed_at.map(encode_dt),
      remarks:        r.remarks.clone(),
      created_at:     encode_dt(r.created_at),
      updated_at:     encode_dt(r.updated_at),
    }
  }
}

// ─── Account rows ────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str = "account_id, username, role, full_name, email, \
   registration_number, department, created_at, password_hash";

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:          String,
  pub username:            String,
  pub role:                String,
  pub full_name:           Option<String>,
  pub email:               Option<String>,
  pub registration_number: Option<String>,
  pub department:          Option<String>,
  pub created_at:          String,
  pub password_hash:       String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:          row.get(0)?,
      username:            row.get(1)?,
      role:                row.get(2)?,
      full_name:           row.get(3)?,
      email:               row.get(4)?,
      registration_number: row.get(5)?,
      department:          row.get(6)?,
      created_at:          row.get(7)?,
      password_hash:       row.get(8)?,
    })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    Ok(Credentials {
      account:       Account {
        id:         decode_uuid(&self.account_id)?,
        username:   self.username,
        role:       decode_enum("role", &self.role)?,
        profile:    Profile {
          full_name:           self.full_name,
          email:               self.email,
          registration_number: self.registration_number,
          department:          self.department,
        },
        created_at: decode_dt(&self.created_at)?,
      },
      password_hash: self.password_hash,
    })
  }
}
