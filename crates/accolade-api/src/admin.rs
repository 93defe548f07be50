//! Handlers for `/admin` endpoints. Role checks happen in the workflow, and
//! also up front wherever admin-only input is parsed; a
//! non-admin caller gets 403 from every route here.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admin/achievements` | Optional `?status=pending\|approved\|rejected` |
//! | `PUT`    | `/admin/achievements/:id/review` | Body: `{"status":"approved","remarks":"…"}` |
//! | `DELETE` | `/admin/achievements/:id` | Any status; 204 |
//! | `GET`    | `/admin/dashboard/stats` | |
//! | `GET`    | `/admin/students` | |
//! | `GET`    | `/admin/students/:id` | Student plus all their records |

use accolade_core::{
  account::Account,
  record::{AchievementRecord, Status},
  store::{AccountDirectory, BlobStore, RecordStore},
  workflow::{DashboardStats, StudentDetail, require_admin},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery},
};

// ─── Achievements ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<String>,
}

/// `GET /admin/achievements[?status=<status>]` — an empty `status` means no
/// filter.
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<AchievementRecord>>, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  require_admin(&actor, "list all achievements")?;
  let status = params
    .status
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(Status::parse)
    .transpose()?;
  Ok(Json(state.workflow.view_as_admin(&actor, status).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub status:  String,
  pub remarks: Option<String>,
}

/// `PUT /admin/achievements/:id/review`
pub async fn review<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<ReviewBody>,
) -> Result<Json<AchievementRecord>, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  require_admin(&actor, "review achievements")?;
  let decision = Status::parse(&body.status)?;
  let record = state
    .workflow
    .review(&actor, id, decision, body.remarks)
    .await?;
  Ok(Json(record))
}

/// `DELETE /admin/achievements/:id`
pub async fn remove<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  state.workflow.admin_remove(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// `GET /admin/dashboard/stats`
pub async fn stats<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
) -> Result<Json<DashboardStats>, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  Ok(Json(state.workflow.dashboard_stats(&actor).await?))
}

// ─── Students ────────────────────────────────────────────────────────────────

/// `GET /admin/students`
pub async fn students<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
) -> Result<Json<Vec<Account>>, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  Ok(Json(state.workflow.list_students(&actor).await?))
}

/// `GET /admin/students/:id`
pub async fn student_detail<S, B>(
  State(state): State<AppState<S, B>>,
  Authenticated(actor): Authenticated,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StudentDetail>, ApiError>
where
  S: RecordStore + AccountDirectory + 'static,
  B: BlobStore + 'static,
{
  Ok(Json(state.workflow.student_detail(&actor, id).await?))
}
