//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use accolade_core::{
  account::{Account, NewAccount, Profile, Role},
  record::{BlobRef, Level, Position, RecordFields, RecordPatch, Review, Status},
  store::{AccountDirectory, RecordStore},
  workflow::ReviewWorkflow,
};
use chrono::Utc;
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn account(s: &SqliteStore, username: &str, role: Role) -> Account {
  s.create_account(NewAccount {
    username:      username.into(),
    password_hash: "$argon2id$stub".into(),
    role,
    profile:       Profile {
      full_name:           Some(format!("{username} full name")),
      email:               Some(format!("{username}@college.edu")),
      registration_number: None,
      department:          Some("CSE".into()),
    },
  })
  .await
  .unwrap()
}

fn fields(title: &str) -> RecordFields {
  RecordFields {
    title:       Some(title.into()),
    description: Some("Built a scheduling assistant in 24 hours".into()),
    kind:        Some("competition".into()),
    level:       Some("national".into()),
    position:    Some("runner-up".into()),
    organizer:   Some("Major League Hacking".into()),
    date:        Some("2024-03-01".into()),
  }
}

fn review_by(admin: &Account, status: Status) -> RecordPatch {
  RecordPatch {
    review: Some(Review {
      status,
      reviewed_by: admin.id,
      reviewed_at: Utc::now(),
      remarks: Some("verified certificate".into()),
    }),
    ..Default::default()
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_account() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;

  let by_id = s.find_by_id(alice.id).await.unwrap().unwrap();
  assert_eq!(by_id, alice);
  assert_eq!(by_id.profile.department.as_deref(), Some("CSE"));

  let by_name = s.find_by_username("alice".into()).await.unwrap().unwrap();
  assert_eq!(by_name.id, alice.id);

  let creds = s.credentials("alice".into()).await.unwrap().unwrap();
  assert_eq!(creds.password_hash, "$argon2id$stub");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  account(&s, "alice", Role::Student).await;

  let err = s
    .create_account(NewAccount {
      username:      "alice".into(),
      password_hash: "x".into(),
      role:          Role::Admin,
      profile:       Profile::default(),
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(accolade_core::Error::UsernameTaken(ref u)) if u == "alice"
  ));
  assert_eq!(s.count_by_role(Role::Admin).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_account_is_none() {
  let s = store().await;
  assert!(s.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.credentials("ghost".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn accounts_by_role() {
  let s = store().await;
  let a = account(&s, "a", Role::Student).await;
  let b = account(&s, "b", Role::Student).await;
  account(&s, "root", Role::Admin).await;

  assert_eq!(s.count_by_role(Role::Student).await.unwrap(), 2);
  assert_eq!(s.count_by_role(Role::Admin).await.unwrap(), 1);

  let students = s.list_by_role(Role::Student).await.unwrap();
  let ids: Vec<_> = students.iter().map(|a| a.id).collect();
  assert_eq!(ids, vec![b.id, a.id]);
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_record() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;

  let evidence = BlobRef("abc123.pdf".into());
  let created = s
    .create(alice.id, fields("Hackathon Win"), Some(evidence.clone()))
    .await
    .unwrap();
  assert_eq!(created.status, Status::Pending);
  assert_eq!(created.position, Position::RunnerUp);

  let fetched = s.get(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.evidence, Some(evidence));
}

#[tokio::test]
async fn get_missing_record_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_validates_fields() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;

  let mut bad = fields("Hackathon Win");
  bad.level = Some("galactic".into());
  let err = s.create(alice.id, bad, None).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(accolade_core::Error::Validation(_))));
  assert_eq!(s.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn create_for_unknown_owner_fails() {
  let s = store().await;
  let err = s.create(Uuid::new_v4(), fields("Orphan"), None).await;
  assert!(matches!(err, Err(crate::Error::Database(_))));
}

#[tokio::test]
async fn lists_are_newest_first() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;
  let bob = account(&s, "bob", Role::Student).await;

  let first = s.create(alice.id, fields("First"), None).await.unwrap();
  let other = s.create(bob.id, fields("Bob's"), None).await.unwrap();
  let second = s.create(alice.id, fields("Second"), None).await.unwrap();

  let mine: Vec<_> = s
    .list_by_owner(alice.id)
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.id)
    .collect();
  assert_eq!(mine, vec![second.id, first.id]);

  let all: Vec<_> = s
    .list_all(None)
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.id)
    .collect();
  assert_eq!(all, vec![second.id, other.id, first.id]);
}

#[tokio::test]
async fn list_and_count_by_status() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;
  let admin = account(&s, "root", Role::Admin).await;

  let approved = s.create(alice.id, fields("A"), None).await.unwrap();
  let rejected = s.create(alice.id, fields("B"), None).await.unwrap();
  s.create(alice.id, fields("C"), None).await.unwrap();

  s.update(approved.id, review_by(&admin, Status::Approved))
    .await
    .unwrap();
  s.update(rejected.id, review_by(&admin, Status::Rejected))
    .await
    .unwrap();

  assert_eq!(s.count(None).await.unwrap(), 3);
  assert_eq!(s.count(Some(Status::Pending)).await.unwrap(), 1);
  assert_eq!(s.count(Some(Status::Approved)).await.unwrap(), 1);

  let only_approved = s.list_all(Some(Status::Approved)).await.unwrap();
  assert_eq!(only_approved.len(), 1);
  assert_eq!(only_approved[0].id, approved.id);
  assert_eq!(only_approved[0].reviewed_by, Some(admin.id));
  assert_eq!(only_approved[0].remarks.as_deref(), Some("verified certificate"));
  assert!(only_approved[0].review_fields_consistent());
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_touches_only_supplied_fields() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;
  let created = s
    .create(alice.id, fields("Hackathon Win"), Some(BlobRef("old.pdf".into())))
    .await
    .unwrap();

  let patch = RecordPatch {
    fields: RecordFields {
      level: Some("international".into()),
      title: Some("   ".into()),
      ..Default::default()
    },
    ..Default::default()
  };
  let updated = s.update(created.id, patch).await.unwrap();

  assert_eq!(updated.level, Level::International);
  assert_eq!(updated.title, "Hackathon Win");
  assert_eq!(updated.evidence, Some(BlobRef("old.pdf".into())));
  assert!(updated.updated_at > created.updated_at);
  assert_eq!(updated.created_at, created.created_at);

  let stored = s.get(created.id).await.unwrap().unwrap();
  assert_eq!(stored, updated);
}

#[tokio::test]
async fn update_rejects_owner_change_and_writes_nothing() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;
  let created = s.create(alice.id, fields("Mine"), None).await.unwrap();

  let patch = RecordPatch {
    fields: RecordFields { title: Some("Hijacked".into()), ..Default::default() },
    owner: Some(Uuid::new_v4()),
    ..Default::default()
  };
  let err = s.update(created.id, patch).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(accolade_core::Error::ImmutableField("owner"))
  ));

  let stored = s.get(created.id).await.unwrap().unwrap();
  assert_eq!(stored, created);
}

#[tokio::test]
async fn stale_update_conflicts() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;
  let created = s.create(alice.id, fields("Mine"), None).await.unwrap();

  let first = RecordPatch {
    fields: RecordFields { title: Some("One".into()), ..Default::default() },
    expected_updated_at: Some(created.updated_at),
    ..Default::default()
  };
  s.update(created.id, first).await.unwrap();

  let second = RecordPatch {
    fields: RecordFields { title: Some("Two".into()), ..Default::default() },
    expected_updated_at: Some(created.updated_at),
    ..Default::default()
  };
  let err = s.update(created.id, second).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(accolade_core::Error::Conflict(_))));
  assert_eq!(s.get(created.id).await.unwrap().unwrap().title, "One");
}

#[tokio::test]
async fn update_missing_record_is_not_found() {
  let s = store().await;
  let err = s
    .update(Uuid::new_v4(), RecordPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Core(accolade_core::Error::NotFound(_))));
}

// ─── Deletes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_record() {
  let s = store().await;
  let alice = account(&s, "alice", Role::Student).await;
  let created = s.create(alice.id, fields("Mine"), None).await.unwrap();

  s.delete(created.id).await.unwrap();
  assert!(s.get(created.id).await.unwrap().is_none());

  let err = s.delete(created.id).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(accolade_core::Error::NotFound(_))));
}

// ─── Through the workflow ────────────────────────────────────────────────────

#[tokio::test]
async fn workflow_over_sqlite() {
  let s = Arc::new(store().await);
  let engine = ReviewWorkflow::new(s.clone(), s.clone());
  let alice = account(&s, "alice", Role::Student).await;
  let admin = account(&s, "root", Role::Admin).await;

  let record = engine.submit(&alice, fields("Hackathon Win"), None).await.unwrap();
  let reviewed = engine
    .review(&admin, record.id, Status::Approved, Some("Great".into()))
    .await
    .unwrap();
  assert_eq!(reviewed.status, Status::Approved);

  let err = engine.withdraw(&alice, record.id).await.unwrap_err();
  assert!(matches!(err, accolade_core::Error::InvalidState { .. }));

  let stats = engine.dashboard_stats(&admin).await.unwrap();
  assert_eq!(stats.student_count, 1);
  assert_eq!(stats.total_records, 1);
  assert_eq!(stats.pending_count, 0);
  assert_eq!(stats.approved_count, 1);

  engine.admin_remove(&admin, record.id).await.unwrap();
  assert_eq!(engine.view_as_owner(&alice).await.unwrap().len(), 0);
}
