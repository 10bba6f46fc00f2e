//! Tenant-scoped write and read paths for audit logs.
//!
//! Every operation takes the authenticated caller and scopes itself to the
//! caller's tenant. Writes hand committed events to the fan-out dispatcher
//! without waiting on it.

pub mod export;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::db::audit_logs::{ActionCount, DayCount, LogFilter, SeverityCount};
use crate::error::AppError;
use crate::models::{AuditLog, NewAuditLog};
use crate::state::SharedState;

const STATS_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct LogStats {
    pub total_logs: i64,
    pub by_action: Vec<ActionCount>,
    pub by_severity: Vec<SeverityCount>,
    pub last_7_days: Vec<DayCount>,
}

pub async fn create(
    state: &SharedState,
    auth: &AuthUser,
    log: NewAuditLog,
) -> Result<AuditLog, AppError> {
    auth.require_tenant(log.tenant_id)?;
    log.validate().map_err(AppError::BadRequest)?;

    let created = db::audit_logs::create(&state.pool, &log).await?;
    tracing::info!(
        "Audit log {} created for tenant {} by {}",
        created.id,
        created.tenant_id,
        auth.subject
    );

    state.dispatcher.publish(created.clone());
    Ok(created)
}

/// Inserts the whole batch or nothing. Tenant checks run over the entire
/// batch before the first write.
pub async fn create_bulk(
    state: &SharedState,
    auth: &AuthUser,
    logs: Vec<NewAuditLog>,
) -> Result<usize, AppError> {
    if logs.is_empty() {
        return Err(AppError::BadRequest("Request body is empty".to_string()));
    }

    for (index, log) in logs.iter().enumerate() {
        auth.require_tenant(log.tenant_id)?;
        log.validate()
            .map_err(|e| AppError::BadRequest(format!("Entry {index}: {e}")))?;
    }

    let created = db::audit_logs::create_many(&state.pool, &logs).await?;
    let count = created.len();
    tracing::info!("{count} audit logs created for tenant {}", auth.tenant_id());

    for log in created {
        state.dispatcher.publish(log);
    }
    Ok(count)
}

pub async fn search(
    state: &SharedState,
    auth: &AuthUser,
    filter: &LogFilter,
) -> Result<Vec<AuditLog>, AppError> {
    Ok(db::audit_logs::list(&state.pool, auth.tenant_id(), filter).await?)
}

pub async fn get(state: &SharedState, auth: &AuthUser, id: Uuid) -> Result<AuditLog, AppError> {
    db::audit_logs::find_by_id_scoped(&state.pool, id, auth.tenant_id())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Log with id {id} does not exist")))
}

pub async fn stats(state: &SharedState, auth: &AuthUser) -> Result<LogStats, AppError> {
    let tenant_id = auth.tenant_id();
    let since = Utc::now() - Duration::days(STATS_WINDOW_DAYS);

    Ok(LogStats {
        total_logs: db::audit_logs::count(&state.pool, tenant_id).await?,
        by_action: db::audit_logs::count_by_action(&state.pool, tenant_id).await?,
        by_severity: db::audit_logs::count_by_severity(&state.pool, tenant_id).await?,
        last_7_days: db::audit_logs::count_per_day(&state.pool, tenant_id, since).await?,
    })
}

/// Newest first.
pub async fn export(state: &SharedState, auth: &AuthUser) -> Result<Vec<AuditLog>, AppError> {
    Ok(db::audit_logs::list_for_export(&state.pool, auth.tenant_id()).await?)
}

pub async fn delete_all(state: &SharedState, auth: &AuthUser) -> Result<u64, AppError> {
    let deleted = db::audit_logs::delete_all(&state.pool, auth.tenant_id()).await?;
    tracing::info!("{deleted} audit logs deleted for tenant {}", auth.tenant_id());
    Ok(deleted)
}

pub async fn delete_one(state: &SharedState, auth: &AuthUser, id: Uuid) -> Result<(), AppError> {
    if db::audit_logs::delete_scoped(&state.pool, id, auth.tenant_id()).await? {
        tracing::info!("Audit log {id} deleted for tenant {}", auth.tenant_id());
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Log with id {id} does not exist")))
    }
}
