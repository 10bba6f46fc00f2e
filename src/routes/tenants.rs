use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AdminUser;
use crate::db;
use crate::error::AppError;
use crate::models::Tenant;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub status: Option<String>,
}

pub async fn list(
    _admin: AdminUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tenants = db::tenants::list(&state.pool).await?;
    Ok(Json(json!({ "data": tenants })))
}

pub async fn create(
    AdminUser(auth): AdminUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateTenant>, AppError>,
) -> Result<(StatusCode, Json<Tenant>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Tenant name is required".to_string()));
    }
    let status = req.status.as_deref().unwrap_or("active");

    let tenant = db::tenants::create(&state.pool, name, status).await?;
    tracing::info!("Tenant {} ({}) created by {}", tenant.id, tenant.name, auth.subject);

    Ok((StatusCode::CREATED, Json(tenant)))
}
