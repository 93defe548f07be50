//! Handlers for the owner-facing `/achievements` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/achievements` | The caller's records, newest first |
//! | `POST`   | `/achievements` | 201; owner is always the caller |
//! | `GET`    | `/achievements/:id` | Owner or admin; sets `ETag` |
//! | `PUT`    | `/achievements/:id` | Owner, pending only; honours `If-Match` |
//! | `DELETE` | `/achievements/:id` | Owner, pending only; 204 |

use accolade_core::{
  Error,
  etag::compute_etag,
  record::{AchievementRecord, BlobRef, RecordFields},
  store::{AccountDirectory, BlobStore, RecordStore},
  workflow::Amendment,
};
use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── Evidence ────────────────────────────────────────────────────────────────

/// An evidence file carried inline in a JSON body.
#[derive(Debug, Deserialize)]
pub struct EvidenceUpload {
  pub content_type: Option<String>,
  /// Standard base64 of the file contents.
  pub data:         String,
}

/// The `evidence` key of an update body. A client that echoes a fetched record
/// back sends the stored reference string; that is not a replacement and is
/// dropped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EvidenceInput {
  Upload(EvidenceUpload),
  Reference(BlobRef),
}

impl EvidenceInput {
  fn into_upload(self) -> Option<EvidenceUpload> {
    match self {
      EvidenceInput::Upload(upload) => Some(upload),
      EvidenceInput::Reference(_) => None,
    }
  }
}

/// Decode and store `upload`, returning the blob reference to attach.
async fn store_evidence<B: BlobStore>(
  blobs: &B,
  upload: Option<EvidenceUpload>,
  limit: usize,
) -> Result<Option<BlobRef>, ApiError> {
  let Some(upload) = upload else {
    return Ok(None);
  };

  let bytes = B64
    .decode(upload.data.trim())
    .map_err(|e| ApiError::BadRequest(format!("evidence is not valid base64: {e}")))?;
  if bytes.is_empty() {
    return Err(ApiError::BadRequest("evidence file is empty".into()));
  }
  if bytes.len() > limit {
    return Err(ApiError::PayloadTooLarge { limit });
  }

  let size = bytes.len();
  let reference = blobs
    .store(bytes, upload.content_type)
    .await
    .map_err(|e| Error::Storage(Box::new(e)))?;
  tracing::debug!(%reference, size, "stored evidence");
  Ok(Some(reference))
}

fn with_etag(record: AchievementRecord) -> impl IntoResponse {
  ([(header::ETAG, compute_etag(&record))], Json(record))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /achievements`
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
) -> Result<Json<Vec<AchievementRecord>>, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  Ok(Json(state.workflow.view_as_owner(&actor).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub fields:   RecordFields,
  pub evidence: Option<EvidenceUpload>,
}

/// `POST /achievements` — body: the record fields, optionally with
/// `"evidence": {"content_type": "…", "data": "<base64>"}`.
pub async fn create<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  let evidence =
    store_evidence(state.blobs.as_ref(), body.evidence, state.max_upload_bytes).await?;
  let record = state.workflow.submit(&actor, body.fields, evidence).await?;
  Ok((StatusCode::CREATED, with_etag(record)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /achievements/:id`
pub async fn get_one<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  let record = state.workflow.inspect(&actor, id).await?;
  Ok(with_etag(record))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub fields:     RecordFields,
  pub evidence:   Option<EvidenceInput>,
  pub owner:      Option<Uuid>,
  pub created_at: Option<DateTime<Utc>>,
}

/// `PUT /achievements/:id` — absent or blank fields keep their stored value.
pub async fn update<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiPath(id): ApiPath<Uuid>,
  headers: HeaderMap,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  let if_match = headers
    .get(header::IF_MATCH)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  let upload = body.evidence.and_then(EvidenceInput::into_upload);
  let evidence = store_evidence(state.blobs.as_ref(), upload, state.max_upload_bytes).await?;
  let amendment = Amendment {
    fields: body.fields,
    evidence,
    owner: body.owner,
    created_at: body.created_at,
    if_match,
  };
  let record = state.workflow.amend(&actor, id, amendment).await?;
  Ok(with_etag(record))
}

// ─── Withdraw ────────────────────────────────────────────────────────────────

/// `DELETE /achievements/:id`
pub async fn withdraw<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  state.workflow.withdraw(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
