//! The review workflow: every role, ownership, and status check in one place.
//!
//! Transports (HTTP or otherwise) authenticate the caller, then hand the
//! resulting [`Account`] to one of the methods here. The stores underneath
//! perform no authorization of their own.
//!
//! Per record the state machine is:
//!
//! ```text
//! pending ──review──▶ approved ◀──review──▶ rejected
//!    └─────────review─────────────────────────▲
//! ```
//!
//! Nothing ever returns a record to `pending`. Reviewing an already reviewed
//! record is allowed and overwrites the earlier reviewer, time, and remarks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  account::{Account, Role},
  etag,
  record::{AchievementRecord, BlobRef, RecordFields, RecordPatch, Review, Status},
  store::{AccountDirectory, RecordStore},
};

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// An owner's edit to a pending record.
#[derive(Debug, Clone, Default)]
pub struct Amendment {
  pub fields:     RecordFields,
  /// New evidence; `None` keeps whatever reference is already stored.
  pub evidence:   Option<BlobRef>,
  /// Echoed by some clients; rejected by the store if it differs.
  pub owner:      Option<Uuid>,
  pub created_at: Option<DateTime<Utc>>,
  /// ETag the client last saw, from an `If-Match` header.
  pub if_match:   Option<String>,
}

/// Aggregate counts for the admin dashboard. Each count is taken on its own;
/// `student_count` counts accounts, the rest count records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub student_count:  u64,
  pub total_records:  u64,
  pub pending_count:  u64,
  pub approved_count: u64,
}

/// A student account with every record it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDetail {
  pub student:      Account,
  pub achievements: Vec<AchievementRecord>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Enforces who may create, change, delete, and review achievement records.
///
/// Both collaborators are supplied at construction; a single backend wrapped
/// in an `Arc` commonly plays both roles.
pub struct ReviewWorkflow<R, D> {
  records:  R,
  accounts: D,
}

fn lift<E: Into<Error>>(err: E) -> Error { err.into() }

/// The admin gate every admin operation passes first. Callers that parse
/// admin-only input should check it before parsing.
pub fn require_admin(actor: &Account, action: &str) -> Result<()> {
  if actor.is_admin() {
    return Ok(());
  }
  warn!(actor = %actor.id, action, "non-admin attempted an admin operation");
  Err(Error::Forbidden(format!("only administrators may {action}")))
}

/// The owner gate shared by amend and withdraw: right account, still pending.
fn require_pending_owner(actor: &Account, record: &AchievementRecord, action: &str) -> Result<()> {
  if actor.id != record.owner {
    warn!(actor = %actor.id, record_id = %record.id, action, "ownership check failed");
    return Err(Error::Forbidden(format!(
      "only the owner may {action} this achievement"
    )));
  }
  if record.status != Status::Pending {
    return Err(Error::InvalidState { id: record.id, status: record.status });
  }
  Ok(())
}

impl<R, D> ReviewWorkflow<R, D>
where
  R: RecordStore,
  D: AccountDirectory,
{
  pub fn new(records: R, accounts: D) -> Self { Self { records, accounts } }

  pub fn records(&self) -> &R { &self.records }

  pub fn accounts(&self) -> &D { &self.accounts }

  async fn fetch(&self, id: Uuid) -> Result<AchievementRecord> {
    self
      .records
      .get(id)
      .await
      .map_err(lift)?
      .ok_or(Error::NotFound(id))
  }

  // ── Owner operations ──────────────────────────────────────────────────

  /// Submit a new claim. The owner is always the acting account, whatever the
  /// client may have put in the request.
  pub async fn submit(
    &self,
    actor: &Account,
    fields: RecordFields,
    evidence: Option<BlobRef>,
  ) -> Result<AchievementRecord> {
    let record = self
      .records
      .create(actor.id, fields, evidence)
      .await
      .map_err(lift)?;
    info!(record_id = %record.id, owner = %actor.id, "achievement submitted");
    Ok(record)
  }

  /// Edit a pending record the actor owns.
  ///
  /// The write is conditional on the record being unchanged since the gate
  /// check, so a review that lands in between turns this into a conflict
  /// instead of an edit to a reviewed record.
  pub async fn amend(
    &self,
    actor: &Account,
    id: Uuid,
    amendment: Amendment,
  ) -> Result<AchievementRecord> {
    let current = self.fetch(id).await?;
    require_pending_owner(actor, &current, "amend")?;

    if amendment
      .if_match
      .as_deref()
      .is_some_and(|tag| !etag::matches(tag, &current))
    {
      return Err(Error::Conflict(id));
    }

    let patch = RecordPatch {
      fields:              amendment.fields,
      evidence:            amendment.evidence,
      owner:               amendment.owner,
      created_at:          amendment.created_at,
      review:              None,
      expected_updated_at: Some(current.updated_at),
    };
    let updated = self.records.update(id, patch).await.map_err(lift)?;
    info!(record_id = %id, owner = %actor.id, "achievement amended");
    Ok(updated)
  }

  /// Delete a pending record the actor owns.
  pub async fn withdraw(&self, actor: &Account, id: Uuid) -> Result<()> {
    let current = self.fetch(id).await?;
    require_pending_owner(actor, &current, "withdraw")?;
    self.records.delete(id).await.map_err(lift)?;
    info!(record_id = %id, owner = %actor.id, "achievement withdrawn");
    Ok(())
  }

  /// The actor's own records, newest first.
  pub async fn view_as_owner(&self, actor: &Account) -> Result<Vec<AchievementRecord>> {
    self.records.list_by_owner(actor.id).await.map_err(lift)
  }

  /// A single record, visible to its owner and to administrators.
  pub async fn inspect(&self, actor: &Account, id: Uuid) -> Result<AchievementRecord> {
    let record = self.fetch(id).await?;
    if record.owner != actor.id && !actor.is_admin() {
      warn!(actor = %actor.id, record_id = %id, "read of another account's achievement");
      return Err(Error::Forbidden(
        "only the owner or an administrator may view this achievement".into(),
      ));
    }
    Ok(record)
  }

  // ── Admin operations ──────────────────────────────────────────────────

  /// Approve or reject a record.
  ///
  /// `decision` must be [`Status::Approved`] or [`Status::Rejected`]. A record
  /// that was already reviewed may be reviewed again.
  pub async fn review(
    &self,
    admin: &Account,
    id: Uuid,
    decision: Status,
    remarks: Option<String>,
  ) -> Result<AchievementRecord> {
    require_admin(admin, "review achievements")?;
    if decision == Status::Pending {
      return Err(Error::Validation(
        "decision must be \"approved\" or \"rejected\"".into(),
      ));
    }

    let current = self.fetch(id).await?;
    if current.status != Status::Pending {
      debug!(record_id = %id, previous = %current.status, "re-reviewing achievement");
    }

    let patch = RecordPatch {
      review: Some(Review {
        status:      decision,
        reviewed_by: admin.id,
        reviewed_at: Utc::now(),
        remarks,
      }),
      expected_updated_at: Some(current.updated_at),
      ..Default::default()
    };
    let updated = self.records.update(id, patch).await.map_err(lift)?;
    info!(record_id = %id, reviewer = %admin.id, status = %decision, "achievement reviewed");
    Ok(updated)
  }

  /// Delete any record, whatever its status.
  pub async fn admin_remove(&self, admin: &Account, id: Uuid) -> Result<()> {
    require_admin(admin, "remove achievements")?;
    self.records.delete(id).await.map_err(lift)?;
    info!(record_id = %id, admin = %admin.id, "achievement removed by administrator");
    Ok(())
  }

  /// Every record, newest first, optionally filtered by status.
  pub async fn view_as_admin(
    &self,
    admin: &Account,
    status: Option<Status>,
  ) -> Result<Vec<AchievementRecord>> {
    require_admin(admin, "list all achievements")?;
    self.records.list_all(status).await.map_err(lift)
  }

  pub async fn dashboard_stats(&self, admin: &Account) -> Result<DashboardStats> {
    require_admin(admin, "view dashboard statistics")?;
    Ok(DashboardStats {
      student_count:  self.accounts.count_by_role(Role::Student).await.map_err(lift)?,
      total_records:  self.records.count(None).await.map_err(lift)?,
      pending_count:  self.records.count(Some(Status::Pending)).await.map_err(lift)?,
      approved_count: self.records.count(Some(Status::Approved)).await.map_err(lift)?,
    })
  }

  /// Student accounts, newest first.
  pub async fn list_students(&self, admin: &Account) -> Result<Vec<Account>> {
    require_admin(admin, "list students")?;
    self.accounts.list_by_role(Role::Student).await.map_err(lift)
  }

  pub async fn student_detail(&self, admin: &Account, student_id: Uuid) -> Result<StudentDetail> {
    require_admin(admin, "view student details")?;
    let student = self
      .accounts
      .find_by_id(student_id)
      .await
      .map_err(lift)?
      .filter(|a| a.role == Role::Student)
      .ok_or(Error::AccountNotFound(student_id))?;
    let achievements = self.records.list_by_owner(student_id).await.map_err(lift)?;
    Ok(StudentDetail { student, achievements })
  }
}
