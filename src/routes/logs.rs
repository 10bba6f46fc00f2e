use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::audit_logs::LogFilter;
use crate::error::AppError;
use crate::ingest::export::csv_stream;
use crate::ingest::{self, LogStats};
use crate::models::{AuditLog, NewAuditLog};
use crate::state::SharedState;

pub async fn search(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Query(filter), _): WithRejection<Query<LogFilter>, AppError>,
) -> Result<Json<serde_json::Value>, AppError> {
    let logs = ingest::search(&state, &auth, &filter).await?;
    Ok(Json(json!({ "data": logs })))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<AuditLog>, AppError> {
    Ok(Json(ingest::get(&state, &auth, id).await?))
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<LogStats>, AppError> {
    Ok(Json(ingest::stats(&state, &auth).await?))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let logs = ingest::export(&state, &auth).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit_logs.csv\"",
            ),
        ],
        Body::from_stream(csv_stream(logs)),
    ))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(log), _): WithRejection<Json<NewAuditLog>, AppError>,
) -> Result<(StatusCode, Json<AuditLog>), AppError> {
    let created = ingest::create(&state, &auth, log).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn create_bulk(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(logs), _): WithRejection<Json<Vec<NewAuditLog>>, AppError>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let inserted = ingest::create_bulk(&state, &auth, logs).await?;
    Ok((StatusCode::CREATED, Json(json!({ "Data inserted": inserted }))))
}

pub async fn delete_all(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<StatusCode, AppError> {
    ingest::delete_all(&state, &auth).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_one(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    ingest::delete_one(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
