//! ETag computation for achievement records.
//!
//! An ETag is a SHA-256 hash over the record id and its `updated_at`
//! timestamp. Every mutation advances `updated_at`, so any change produces a
//! new tag.

use sha2::{Digest, Sha256};

use crate::record::AchievementRecord;

/// Compute the quoted ETag for `record`.
pub fn compute_etag(record: &AchievementRecord) -> String {
  let mut hasher = Sha256::new();
  hasher.update(record.id.as_bytes());
  hasher.update(
    record
      .updated_at
      .timestamp_nanos_opt()
      .unwrap_or_else(|| record.updated_at.timestamp_micros())
      .to_le_bytes(),
  );
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Compare an `If-Match` value against `record`.
///
/// Clients send the tag with or without the surrounding double-quotes; both
/// forms are accepted. `*` matches any existing record.
pub fn matches(if_match: &str, record: &AchievementRecord) -> bool {
  let wanted = if_match.trim();
  wanted == "*" || wanted.trim_matches('"') == compute_etag(record).trim_matches('"')
}
