//! Achievement records — the claims students submit for review.
//!
//! A record is created `pending`, may be edited by its owner while it stays
//! pending, and is moved to `approved` or `rejected` by an administrator.
//! Field validation lives here so every backend enforces the same rules.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Review status of a record.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
  #[default]
  Pending,
  Approved,
  Rejected,
}

impl Status {
  /// Parse a status supplied by a client, e.g. a `?status=` filter or a review
  /// decision.
  pub fn parse(raw: &str) -> Result<Self> { parse_choice("status", raw) }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// What sort of achievement is being claimed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AchievementKind {
  Event,
  Award,
  Recognition,
  Participation,
  Competition,
}

/// The scope at which the achievement was earned.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
  College,
  State,
  National,
  International,
}

/// The student's part in the event.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Position {
  Winner,
  RunnerUp,
  #[default]
  Participant,
  Organizer,
  Speaker,
}

// ─── Evidence ────────────────────────────────────────────────────────────────

/// Opaque handle returned by a [`crate::store::BlobStore`]. The core never
/// looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub String);

impl BlobRef {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for BlobRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored achievement claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
  pub id:          Uuid,
  /// The submitting account; never changes after creation.
  pub owner:       Uuid,
  pub title:       String,
  pub description: String,
  #[serde(rename = "type")]
  pub kind:        AchievementKind,
  pub level:       Level,
  pub position:    Position,
  pub organizer:   String,
  pub occurred_on: NaiveDate,
  pub evidence:    Option<BlobRef>,
  pub status:      Status,
  pub reviewed_by: Option<Uuid>,
  pub reviewed_at: Option<DateTime<Utc>>,
  pub remarks:     Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl AchievementRecord {
  /// Validate `fields` and build a fresh pending record owned by `owner`.
  ///
  /// Every required field must be present and non-blank; `position` defaults
  /// to [`Position::Participant`].
  pub fn draft(
    owner: Uuid,
    fields: RecordFields,
    evidence: Option<BlobRef>,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let title = required_text("title", fields.title)?;
    let description = required_text("description", fields.description)?;
    let kind = parse_choice("type", &required_text("type", fields.kind)?)?;
    let level = parse_choice("level", &required_text("level", fields.level)?)?;
    let position = match non_blank(fields.position) {
      Some(raw) => parse_choice("position", &raw)?,
      None => Position::default(),
    };
    let organizer = required_text("organizer", fields.organizer)?;
    let occurred_on = parse_date(&required_text("date", fields.date)?)?;

    Ok(Self {
      id: Uuid::new_v4(),
      owner,
      title,
      description,
      kind,
      level,
      position,
      organizer,
      occurred_on,
      evidence,
      status: Status::Pending,
      reviewed_by: None,
      reviewed_at: None,
      remarks: None,
      created_at: now,
      updated_at: now,
    })
  }

  /// `true` when the review fields agree with the status: a reviewed record
  /// names its reviewer and review time, and an unreviewed one is pending.
  pub fn review_fields_consistent(&self) -> bool {
    let reviewed = self.reviewed_by.is_some() && self.reviewed_at.is_some();
    match self.status {
      Status::Pending => self.reviewed_by.is_none(),
      Status::Approved | Status::Rejected => reviewed,
    }
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Client-supplied record fields, as raw text.
///
/// Used both for creation (where the required fields must be present) and for
/// amendment (where absent or blank fields leave the stored value alone).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFields {
  pub title:       Option<String>,
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub kind:        Option<String>,
  pub level:       Option<String>,
  pub position:    Option<String>,
  pub organizer:   Option<String>,
  #[serde(alias = "occurred_on")]
  pub date:        Option<String>,
}

/// The outcome of an administrator's review, written by
/// [`RecordPatch::apply_to`].
#[derive(Debug, Clone)]
pub struct Review {
  pub status:      Status,
  pub reviewed_by: Uuid,
  pub reviewed_at: DateTime<Utc>,
  /// Replaces any earlier remarks, including with `None`.
  pub remarks:     Option<String>,
}

/// A partial update to a stored record.
///
/// Input to [`crate::store::RecordStore::update`]. The store performs no
/// permission checks; gating is the workflow's job.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
  pub fields:              RecordFields,
  /// Replaces the stored reference only when `Some`.
  pub evidence:            Option<BlobRef>,
  /// Present only to be rejected if it differs from the stored owner.
  pub owner:               Option<Uuid>,
  /// Present only to be rejected if it differs from the stored value.
  pub created_at:          Option<DateTime<Utc>>,
  pub review:              Option<Review>,
  /// Compare-and-swap guard: the update fails with [`Error::Conflict`] unless
  /// the stored `updated_at` still equals this value.
  pub expected_updated_at: Option<DateTime<Utc>>,
}

impl RecordPatch {
  /// Validate the patch against `current` and return the updated record.
  ///
  /// Nothing is written here; every supplied field is checked before the
  /// caller persists anything, so a failing patch leaves no trace.
  pub fn apply_to(
    self,
    current: &AchievementRecord,
    now: DateTime<Utc>,
  ) -> Result<AchievementRecord> {
    if self.owner.is_some_and(|owner| owner != current.owner) {
      return Err(Error::ImmutableField("owner"));
    }
    if self.created_at.is_some_and(|at| at != current.created_at) {
      return Err(Error::ImmutableField("created_at"));
    }
    if self
      .expected_updated_at
      .is_some_and(|at| at != current.updated_at)
    {
      return Err(Error::Conflict(current.id));
    }

    let mut next = current.clone();
    let fields = self.fields;

    if let Some(title) = non_blank(fields.title) {
      next.title = title;
    }
    if let Some(description) = non_blank(fields.description) {
      next.description = description;
    }
    if let Some(raw) = non_blank(fields.kind) {
      next.kind = parse_choice("type", &raw)?;
    }
    if let Some(raw) = non_blank(fields.level) {
      next.level = parse_choice("level", &raw)?;
    }
    if let Some(raw) = non_blank(fields.position) {
      next.position = parse_choice("position", &raw)?;
    }
    if let Some(organizer) = non_blank(fields.organizer) {
      next.organizer = organizer;
    }
    if let Some(raw) = non_blank(fields.date) {
      next.occurred_on = parse_date(&raw)?;
    }
    if let Some(evidence) = self.evidence {
      next.evidence = Some(evidence);
    }

    if let Some(review) = self.review {
      if review.status == Status::Pending {
        return Err(Error::validation(
          "a review must either approve or reject the achievement",
        ));
      }
      next.status = review.status;
      next.reviewed_by = Some(review.reviewed_by);
      next.reviewed_at = Some(review.reviewed_at);
      next.remarks = review.remarks;
    }

    // Strictly advance so compare-and-swap on `updated_at` can't be fooled by
    // two writes landing in the same clock tick.
    next.updated_at = now.max(current.updated_at + TimeDelta::microseconds(1));
    Ok(next)
  }
}

// ─── Parsing helpers ─────────────────────────────────────────────────────────

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

fn required_text(field: &str, value: Option<String>) -> Result<String> {
  non_blank(value).ok_or_else(|| Error::validation(format!("{field} is required")))
}

fn parse_choice<T>(field: &str, raw: &str) -> Result<T>
where
  T: FromStr + VariantNames,
{
  raw.trim().parse().map_err(|_| {
    Error::validation(format!(
      "{field}: {raw:?} is not one of {}",
      T::VARIANTS.join(", ")
    ))
  })
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
fn parse_date(raw: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
    .map_err(|_| Error::validation(format!("date: {raw:?} is not a valid date")))
}
