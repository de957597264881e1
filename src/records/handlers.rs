use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{dto::CreateRecordRequest, repo_types::Record, services, stats::Summary};
use crate::{
    auth::extractors::MaybeUser,
    error::{AppError, AppResult, MessageBody},
    state::AppState,
};

pub fn records_routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route(
            "/records/summary",
            get(records_summary).delete(delete_summary_path),
        )
        .route("/records/:id", delete(delete_record))
}

#[instrument(skip(state, user))]
pub async fn list_records(
    State(state): State<AppState>,
    user: MaybeUser,
) -> AppResult<Json<Vec<Record>>> {
    let rows = services::list(state.records.as_ref(), user.0).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user, payload))]
pub async fn create_record(
    State(state): State<AppState>,
    user: MaybeUser,
    payload: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Record>)> {
    // identity is checked before the body, matching the other routes
    if user.0.is_none() {
        return Err(AppError::Unauthorized);
    }
    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "rejected record body");
        AppError::Validation("Missing required fields".into())
    })?;
    let rec = services::create(state.records.as_ref(), user.0, body).await?;
    Ok((StatusCode::CREATED, Json(rec)))
}

#[instrument(skip(state, user))]
pub async fn delete_record(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageBody>> {
    services::delete(state.records.as_ref(), user.0, &id).await?;
    Ok(Json(MessageBody::new("Record deleted")))
}

/// `/records/summary` shadows `/records/:id`; a DELETE there is just a
/// record id that can never exist.
#[instrument(skip(state, user))]
pub async fn delete_summary_path(
    State(state): State<AppState>,
    user: MaybeUser,
) -> AppResult<Json<MessageBody>> {
    services::delete(state.records.as_ref(), user.0, "summary").await?;
    Ok(Json(MessageBody::new("Record deleted")))
}

#[instrument(skip(state, user))]
pub async fn records_summary(
    State(state): State<AppState>,
    user: MaybeUser,
) -> AppResult<Json<Summary>> {
    let s = services::summary(state.records.as_ref(), user.0).await?;
    Ok(Json(s))
}
