//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`] and
//! [`AccountDirectory`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use accolade_core::{
  account::{Account, Credentials, NewAccount, Role},
  record::{AchievementRecord, BlobRef, RecordFields, RecordPatch, Status},
  store::{AccountDirectory, RecordStore},
};

use crate::{
  encode::{
    encode_dt, encode_uuid, RawAccount, RawRecord, RecordParams, ACCOUNT_COLUMNS,
    RECORD_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Accolade record store and account directory backed by a single SQLite
/// file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What a guarded `UPDATE` found when it touched no rows.
enum WriteOutcome {
  Written,
  Missing,
  Stale,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a record `SELECT` whose column list is [`RECORD_COLUMNS`].
  async fn select_records(
    &self,
    sql: String,
    param: Option<String>,
  ) -> Result<Vec<AchievementRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn select_accounts(&self, sql: String, param: String) -> Result<Vec<Credentials>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_credentials).collect()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn create(
    &self,
    owner: Uuid,
    fields: RecordFields,
    evidence: Option<BlobRef>,
  ) -> Result<AchievementRecord> {
    let record = AchievementRecord::draft(owner, fields, evidence, Utc::now())?;
    let p = RecordParams::from(&record);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievements (
             achievement_id, owner_id, title, description, kind, level,
             position, organizer, occurred_on, evidence_ref, status,
             reviewed_by, reviewed_at, remarks, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
          rusqlite::params![
            p.achievement_id,
            p.owner_id,
            p.title,
            p.description,
            p.kind,
            p.level,
            p.position,
            p.organizer,
            p.occurred_on,
            p.evidence_ref,
            p.status,
            p.reviewed_by,
            p.reviewed_at,
            p.remarks,
            p.created_at,
            p.updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(id = %record.id, owner = %owner, "inserted achievement");
    Ok(record)
  }

  async fn get(&self, id: Uuid) -> Result<Option<AchievementRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RECORD_COLUMNS} FROM achievements WHERE achievement_id = ?1"),
              rusqlite::params![id_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<AchievementRecord>> {
    self
      .select_records(
        format!(
          "SELECT {RECORD_COLUMNS} FROM achievements WHERE owner_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ),
        Some(encode_uuid(owner)),
      )
      .await
  }

  async fn list_all(&self, status: Option<Status>) -> Result<Vec<AchievementRecord>> {
    match status {
      Some(s) => {
        self
          .select_records(
            format!(
              "SELECT {RECORD_COLUMNS} FROM achievements WHERE status = ?1
               ORDER BY created_at DESC, rowid DESC"
            ),
            Some(s.as_ref().to_owned()),
          )
          .await
      }
      None => {
        self
          .select_records(
            format!(
              "SELECT {RECORD_COLUMNS} FROM achievements ORDER BY created_at DESC, rowid DESC"
            ),
            None,
          )
          .await
      }
    }
  }

  async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<AchievementRecord> {
    let current = self
      .get(id)
      .await?
      .ok_or(accolade_core::Error::NotFound(id))?;
    let next = patch.apply_to(&current, Utc::now())?;

    let p = RecordParams::from(&next);
    let seen_updated_at = encode_dt(current.updated_at);

    // Guarded on the `updated_at` we validated against, so a write that lands
    // between our read and this statement is detected rather than overwritten.
    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE achievements SET
             title = ?2, description = ?3, kind = ?4, level = ?5, position = ?6,
             organizer = ?7, occurred_on = ?8, evidence_ref = ?9, status = ?10,
             reviewed_by = ?11, reviewed_at = ?12, remarks = ?13, updated_at = ?14
           WHERE achievement_id = ?1 AND updated_at = ?15",
          rusqlite::params![
            p.achievement_id,
            p.title,
            p.description,
            p.kind,
            p.level,
            p.position,
            p.organizer,
            p.occurred_on,
            p.evidence_ref,
            p.status,
            p.reviewed_by,
            p.reviewed_at,
            p.remarks,
            p.updated_at,
            seen_updated_at,
          ],
        )?;
        if changed > 0 {
          return Ok(WriteOutcome::Written);
        }
        let exists = conn
          .query_row(
            "SELECT 1 FROM achievements WHERE achievement_id = ?1",
            rusqlite::params![p.achievement_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        Ok(if exists { WriteOutcome::Stale } else { WriteOutcome::Missing })
      })
      .await?;

    match outcome {
      WriteOutcome::Written => Ok(next),
      WriteOutcome::Missing => Err(accolade_core::Error::NotFound(id).into()),
      WriteOutcome::Stale => Err(accolade_core::Error::Conflict(id).into()),
    }
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM achievements WHERE achievement_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(accolade_core::Error::NotFound(id).into());
    }
    Ok(())
  }

  async fn count(&self, status: Option<Status>) -> Result<u64> {
    let status_str = status.map(|s| s.as_ref().to_owned());

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM achievements WHERE (?1 IS NULL OR status = ?1)",
          rusqlite::params![status_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(n as u64)
  }
}

// ─── AccountDirectory impl ───────────────────────────────────────────────────

impl AccountDirectory for SqliteStore {
  type Error = Error;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
    let rows = self
      .select_accounts(
        format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
        encode_uuid(id),
      )
      .await?;
    Ok(rows.into_iter().next().map(|c| c.account))
  }

  async fn find_by_username(&self, username: String) -> Result<Option<Account>> {
    Ok(self.credentials(username).await?.map(|c| c.account))
  }

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let account = Account {
      id:         Uuid::new_v4(),
      username:   input.username,
      role:       input.role,
      profile:    input.profile,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(account.id);
    let username = account.username.clone();
    let role_str = account.role.as_ref().to_owned();
    let profile  = account.profile.clone();
    let at_str   = encode_dt(account.created_at);
    let hash     = input.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE username = ?1",
            rusqlite::params![username],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO accounts (
             account_id, username, password_hash, role, full_name, email,
             registration_number, department, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            username,
            hash,
            role_str,
            profile.full_name,
            profile.email,
            profile.registration_number,
            profile.department,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(accolade_core::Error::UsernameTaken(account.username).into());
    }
    tracing::debug!(id = %account.id, username = %account.username, "inserted account");
    Ok(account)
  }

  async fn credentials(&self, username: String) -> Result<Option<Credentials>> {
    let rows = self
      .select_accounts(
        format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
        username,
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn count_by_role(&self, role: Role) -> Result<u64> {
    let role_str = role.as_ref().to_owned();

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM accounts WHERE role = ?1",
          rusqlite::params![role_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(n as u64)
  }

  async fn list_by_role(&self, role: Role) -> Result<Vec<Account>> {
    let rows = self
      .select_accounts(
        format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = ?1
           ORDER BY created_at DESC, rowid DESC"
        ),
        role.as_ref().to_owned(),
      )
      .await?;
    Ok(rows.into_iter().map(|c| c.account).collect())
  }
}
