//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use accolade_core::{
  account::{Account, NewAccount, Profile, Role},
  memory::{MemoryBlobStore, MemoryStore},
  record::BlobRef,
  store::AccountDirectory,
};
use accolade_store_sqlite::SqliteStore;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router, auth::hash_password};

const PASSWORD: &str = "correct horse";

type MemState = AppState<MemoryStore, MemoryBlobStore>;

fn mem_state(max_upload_bytes: usize) -> MemState {
  AppState::new(
    Arc::new(MemoryStore::new()),
    Arc::new(MemoryBlobStore::new()),
    max_upload_bytes,
  )
}

async fn add_account<D: AccountDirectory>(dir: &D, username: &str, role: Role) -> Account {
  dir
    .create_account(NewAccount {
      username:      username.into(),
      password_hash: hash_password(PASSWORD).unwrap(),
      role,
      profile:       Profile::default(),
    })
    .await
    .unwrap()
}

fn basic(user: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{PASSWORD}")))
}

async fn send(
  state: MemState,
  method: &str,
  uri: &str,
  user: Option<&str>,
  headers: Vec<(header::HeaderName, String)>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header(header::AUTHORIZATION, basic(user));
  }
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  api_router(state).oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  }
}

async fn call(
  state: &MemState,
  method: &str,
  uri: &str,
  user: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let resp = send(state.clone(), method, uri, user, vec![], body).await;
  let status = resp.status();
  (status, json_body(resp).await)
}

fn hackathon() -> Value {
  json!({
    "title": "Hackathon Win",
    "description": "Built a scheduling assistant in 24 hours",
    "type": "competition",
    "level": "national",
    "position": "winner",
    "organizer": "Major League Hacking",
    "date": "2024-03-01"
  })
}

fn with(mut base: Value, key: &str, value: Value) -> Value {
  base[key] = value;
  base
}

/// A state with one admin (`root`) and two students (`alice`, `bob`).
async fn seeded(max_upload_bytes: usize) -> (MemState, Account, Account) {
  let state = mem_state(max_upload_bytes);
  add_account(state.directory(), "root", Role::Admin).await;
  let alice = add_account(state.directory(), "alice", Role::Student).await;
  let bob = add_account(state.directory(), "bob", Role::Student).await;
  (state, alice, bob)
}

// ─── Health and accounts ─────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_auth() {
  let state = mem_state(1024);
  let (status, body) = call(&state, "GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_then_me() {
  let state = mem_state(1024);
  let (status, body) = call(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({
      "username": "carol",
      "password": PASSWORD,
      "role": "admin",
      "department": "ECE"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["role"], "student");
  assert_eq!(body["profile"]["department"], "ECE");
  assert!(body.get("password_hash").is_none());

  let (status, me) = call(&state, "GET", "/auth/me", Some("carol"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["username"], "carol");
  assert_eq!(me["id"], body["id"]);
}

#[tokio::test]
async fn register_duplicate_is_conflict() {
  let (state, ..) = seeded(1024).await;
  let (status, body) = call(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "username": "alice", "password": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn register_requires_username() {
  let state = mem_state(1024);
  let (status, _) = call(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "username": "  ", "password": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_colon_in_username() {
  let state = mem_state(1024);
  let (status, body) = call(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "username": "a:b", "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains(':'));
}

#[tokio::test]
async fn missing_credentials_are_challenged() {
  let (state, ..) = seeded(1024).await;
  let resp = send(state, "GET", "/achievements", None, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let challenge = resp.headers().get(header::WWW_AUTHENTICATE).unwrap();
  assert!(challenge.to_str().unwrap().starts_with("Basic"));
}

// ─── Owner routes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_forces_owner_and_sets_etag() {
  let (state, alice, bob) = seeded(1024).await;

  let body = with(hackathon(), "owner", json!(bob.id));
  let resp = send(state.clone(), "POST", "/achievements", Some("alice"), vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert!(resp.headers().contains_key(header::ETAG));

  let record = json_body(resp).await;
  assert_eq!(record["owner"], json!(alice.id));
  assert_eq!(record["status"], "pending");
  assert_eq!(record["type"], "competition");
  assert_eq!(record["position"], "winner");

  let (_, mine) = call(&state, "GET", "/achievements", Some("alice"), None).await;
  assert_eq!(mine.as_array().unwrap().len(), 1);
  let (_, theirs) = call(&state, "GET", "/achievements", Some("bob"), None).await;
  assert!(theirs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_with_missing_field_is_bad_request() {
  let (state, ..) = seeded(1024).await;
  let mut body = hackathon();
  body.as_object_mut().unwrap().remove("organizer");
  let (status, err) = call(&state, "POST", "/achievements", Some("alice"), Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(err["error"].as_str().unwrap().contains("organizer"));
}

#[tokio::test]
async fn records_are_private_to_owner_and_admins() {
  let (state, ..) = seeded(1024).await;
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(hackathon())).await;
  let uri = format!("/achievements/{}", record["id"].as_str().unwrap());

  let (status, _) = call(&state, "GET", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, seen) = call(&state, "GET", &uri, Some("root"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(seen["id"], record["id"]);

  let (status, _) = call(&state, "PUT", &uri, Some("bob"), Some(json!({ "title": "Mine" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&state, "DELETE", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_record_is_not_found() {
  let (state, ..) = seeded(1024).await;
  let uri = format!("/achievements/{}", uuid::Uuid::new_v4());
  let (status, _) = call(&state, "GET", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn amend_keeps_unsent_fields_and_rejects_owner_change() {
  let (state, _, bob) = seeded(1024).await;
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(hackathon())).await;
  let uri = format!("/achievements/{}", record["id"].as_str().unwrap());

  let (status, updated) = call(
    &state,
    "PUT",
    &uri,
    Some("alice"),
    Some(json!({ "level": "international", "title": "" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["level"], "international");
  assert_eq!(updated["title"], "Hackathon Win");

  let (status, _) = call(&state, "PUT", &uri, Some("alice"), Some(json!({ "owner": bob.id }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_if_match_is_precondition_failed() {
  let (state, ..) = seeded(1024).await;
  let resp = send(state.clone(), "POST", "/achievements", Some("alice"), vec![], Some(hackathon())).await;
  let first_tag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
  let record = json_body(resp).await;
  let uri = format!("/achievements/{}", record["id"].as_str().unwrap());

  let resp = send(
    state.clone(),
    "PUT",
    &uri,
    Some("alice"),
    vec![(header::IF_MATCH, first_tag.clone())],
    Some(json!({ "title": "Renamed" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let second_tag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
  assert_ne!(first_tag, second_tag);

  let resp = send(
    state.clone(),
    "PUT",
    &uri,
    Some("alice"),
    vec![(header::IF_MATCH, first_tag)],
    Some(json!({ "title": "Again" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
}

// ─── Evidence ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn evidence_is_stored_and_kept_across_amendments() {
  let (state, ..) = seeded(1024).await;
  let upload = json!({ "content_type": "application/pdf", "data": B64.encode(b"%PDF-1.4 certificate") });
  let body = with(hackathon(), "evidence", upload);

  let (status, record) = call(&state, "POST", "/achievements", Some("alice"), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  let reference = BlobRef(record["evidence"].as_str().unwrap().to_owned());
  let blob = state.blobs.get(&reference).await.unwrap();
  assert_eq!(blob.bytes, b"%PDF-1.4 certificate");
  assert_eq!(blob.content_type.as_deref(), Some("application/pdf"));

  let uri = format!("/achievements/{}", record["id"].as_str().unwrap());
  let (_, updated) = call(&state, "PUT", &uri, Some("alice"), Some(json!({ "title": "Renamed" }))).await;
  assert_eq!(updated["evidence"], record["evidence"]);

  let replacement = json!({ "evidence": { "data": B64.encode(b"new scan") } });
  let (_, replaced) = call(&state, "PUT", &uri, Some("alice"), Some(replacement)).await;
  assert_ne!(replaced["evidence"], record["evidence"]);
}

#[tokio::test]
async fn echoed_record_with_evidence_can_be_put_back() {
  let (state, ..) = seeded(1024).await;
  let body = with(hackathon(), "evidence", json!({ "data": B64.encode(b"certificate") }));
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(body)).await;
  assert!(record["evidence"].is_string());

  let uri = format!("/achievements/{}", record["id"].as_str().unwrap());
  let echoed = with(record.clone(), "title", json!("Hackathon Finalist"));
  let (status, updated) = call(&state, "PUT", &uri, Some("alice"), Some(echoed)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["title"], "Hackathon Finalist");
  assert_eq!(updated["evidence"], record["evidence"]);
  assert_eq!(updated["owner"], record["owner"]);
}

#[tokio::test]
async fn bad_evidence_is_rejected() {
  let (state, ..) = seeded(8).await;

  let body = with(hackathon(), "evidence", json!({ "data": "%%% not base64" }));
  let (status, _) = call(&state, "POST", "/achievements", Some("alice"), Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let body = with(hackathon(), "evidence", json!({ "data": B64.encode(b"far more than eight bytes") }));
  let (status, _) = call(&state, "POST", "/achievements", Some("alice"), Some(body)).await;
  assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

  let (_, mine) = call(&state, "GET", "/achievements", Some("alice"), None).await;
  assert!(mine.as_array().unwrap().is_empty());
}

// ─── Malformed requests ──────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_json_gets_error_body() {
  let (state, ..) = seeded(1024).await;
  let req = Request::post("/achievements")
    .header(header::AUTHORIZATION, basic("alice"))
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{\"title\": "))
    .unwrap();
  let resp = api_router(state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body = json_body(resp).await;
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrongly_typed_json_gets_error_body() {
  let (state, ..) = seeded(1024).await;
  let (status, body) = call(
    &state,
    "POST",
    "/achievements",
    Some("alice"),
    Some(json!({ "title": 7 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn bad_path_id_gets_error_body() {
  let (state, ..) = seeded(1024).await;
  let (status, body) = call(&state, "GET", "/achievements/not-a-uuid", Some("alice"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

// ─── Review workflow ─────────────────────────────────────────────────────────

#[tokio::test]
async fn hackathon_scenario() {
  let (state, alice, _) = seeded(1024).await;
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(hackathon())).await;
  let id = record["id"].as_str().unwrap().to_owned();

  let (status, pending) = call(&state, "GET", "/admin/achievements?status=pending", Some("root"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending.as_array().unwrap().len(), 1);

  let (status, reviewed) = call(
    &state,
    "PUT",
    &format!("/admin/achievements/{id}/review"),
    Some("root"),
    Some(json!({ "status": "approved", "remarks": "Great" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reviewed["status"], "approved");
  assert_eq!(reviewed["remarks"], "Great");
  assert!(reviewed["reviewed_by"].is_string());
  assert_eq!(reviewed["owner"], json!(alice.id));

  let uri = format!("/achievements/{id}");
  let (status, _) = call(&state, "PUT", &uri, Some("alice"), Some(json!({ "title": "Edited" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = call(&state, "DELETE", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, approved) = call(&state, "GET", "/admin/achievements?status=approved", Some("root"), None).await;
  assert_eq!(approved.as_array().unwrap().len(), 1);
  let (_, none_pending) = call(&state, "GET", "/admin/achievements?status=pending", Some("root"), None).await;
  assert!(none_pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn students_cannot_use_admin_routes() {
  let (state, ..) = seeded(1024).await;
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(hackathon())).await;
  let id = record["id"].as_str().unwrap().to_owned();

  let (status, _) = call(
    &state,
    "PUT",
    &format!("/admin/achievements/{id}/review"),
    Some("alice"),
    Some(json!({ "status": "approved" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  for decision in ["archived", "pending"] {
    let (status, _) = call(
      &state,
      "PUT",
      &format!("/admin/achievements/{id}/review"),
      Some("alice"),
      Some(json!({ "status": decision })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{decision}");
  }

  for uri in [
    "/admin/achievements",
    "/admin/achievements?status=bogus",
    "/admin/dashboard/stats",
    "/admin/students",
  ] {
    let (status, _) = call(&state, "GET", uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
  }

  let (status, _) = call(&state, "DELETE", &format!("/admin/achievements/{id}"), Some("alice"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, still) = call(&state, "GET", &format!("/achievements/{id}"), Some("alice"), None).await;
  assert_eq!(still["status"], "pending");
}

#[tokio::test]
async fn review_decision_must_be_final() {
  let (state, ..) = seeded(1024).await;
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(hackathon())).await;
  let uri = format!("/admin/achievements/{}/review", record["id"].as_str().unwrap());

  for decision in ["pending", "archived"] {
    let (status, _) = call(&state, "PUT", &uri, Some("root"), Some(json!({ "status": decision }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{decision}");
  }
}

#[tokio::test]
async fn invalid_status_filter_is_bad_request() {
  let (state, ..) = seeded(1024).await;
  let (status, _) = call(&state, "GET", "/admin/achievements?status=archived", Some("root"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call(&state, "GET", "/admin/achievements?status=", Some("root"), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_removes_reviewed_record() {
  let (state, ..) = seeded(1024).await;
  let (_, record) = call(&state, "POST", "/achievements", Some("alice"), Some(hackathon())).await;
  let id = record["id"].as_str().unwrap().to_owned();

  call(
    &state,
    "PUT",
    &format!("/admin/achievements/{id}/review"),
    Some("root"),
    Some(json!({ "status": "rejected", "remarks": "No certificate" })),
  )
  .await;

  let (status, _) = call(&state, "DELETE", &format!("/achievements/{id}"), Some("alice"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(&state, "DELETE", &format!("/admin/achievements/{id}"), Some("root"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call(&state, "GET", &format!("/achievements/{id}"), Some("alice"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Dashboard and students ──────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_and_student_views() {
  let (state, alice, _) = seeded(1024).await;
  add_account(state.directory(), "dave", Role::Student).await;

  let mut ids = Vec::new();
  for (user, title) in [("alice", "A"), ("alice", "B"), ("bob", "C"), ("bob", "D"), ("dave", "E")] {
    let (_, record) = call(
      &state,
      "POST",
      "/achievements",
      Some(user),
      Some(with(hackathon(), "title", json!(title))),
    )
    .await;
    ids.push(record["id"].as_str().unwrap().to_owned());
  }
  for (id, decision) in [(&ids[0], "approved"), (&ids[2], "approved"), (&ids[4], "rejected")] {
    call(
      &state,
      "PUT",
      &format!("/admin/achievements/{id}/review"),
      Some("root"),
      Some(json!({ "status": decision })),
    )
    .await;
  }

  let (status, stats) = call(&state, "GET", "/admin/dashboard/stats", Some("root"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    stats,
    json!({ "student_count": 3, "total_records": 5, "pending_count": 2, "approved_count": 2 })
  );

  let (_, students) = call(&state, "GET", "/admin/students", Some("root"), None).await;
  assert_eq!(students.as_array().unwrap().len(), 3);

  let (status, detail) = call(&state, "GET", &format!("/admin/students/{}", alice.id), Some("root"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["student"]["username"], "alice");
  assert_eq!(detail["achievements"].as_array().unwrap().len(), 2);
  assert_eq!(detail["achievements"][0]["title"], "B");

  let admin = state
    .directory()
    .find_by_username("root".into())
    .await
    .unwrap()
    .unwrap();
  let (status, _) = call(&state, "GET", &format!("/admin/students/{}", admin.id), Some("root"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── SQLite backend ──────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_backed_round_trip() {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  add_account(store.as_ref(), "root", Role::Admin).await;
  add_account(store.as_ref(), "alice", Role::Student).await;
  let state = AppState::new(store, Arc::new(MemoryBlobStore::new()), 1024);

  let req = |method: &str, uri: &str, user: &str, body: Option<Value>| {
    let builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::AUTHORIZATION, basic(user))
      .header(header::CONTENT_TYPE, "application/json");
    builder
      .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
      .unwrap()
  };

  let resp = api_router(state.clone())
    .oneshot(req("POST", "/achievements", "alice", Some(hackathon())))
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::CREATED);
  let record = json_body(resp).await;
  let id = record["id"].as_str().unwrap().to_owned();

  let resp = api_router(state.clone())
    .oneshot(req(
      "PUT",
      &format!("/admin/achievements/{id}/review"),
      "root",
      Some(json!({ "status": "approved" })),
    ))
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = api_router(state.clone())
    .oneshot(req("GET", "/admin/dashboard/stats", "root", None))
    .await
    .unwrap();
  let stats = json_body(resp).await;
  assert_eq!(stats["approved_count"], 1);
  assert_eq!(stats["pending_count"], 0);
}
