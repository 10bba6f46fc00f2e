use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{AuditLog, NewAuditLog};

const INSERT_SQL: &str = "INSERT INTO audit_logs
     (tenant_id, user_id, session_id, ip_address, user_agent,
      action_type, resource_type, resource_id, severity,
      before_state, after_state, metadata)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
     RETURNING *";

/// Caller-supplied search predicates. The tenant is never part of it; every
/// query takes the tenant separately.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub action_type: Option<String>,
    pub resource_type: Option<String>,
    pub severity: Option<String>,
    /// Free text matched against `resource_id` and the metadata document.
    pub q: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ActionCount {
    pub action_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: i64,
}

async fn insert_row<'e, E: PgExecutor<'e>>(
    executor: E,
    log: &NewAuditLog,
) -> Result<AuditLog, sqlx::Error> {
    sqlx::query_as::<_, AuditLog>(INSERT_SQL)
        .bind(log.tenant_id)
        .bind(log.user_id)
        .bind(&log.session_id)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(&log.action_type)
        .bind(&log.resource_type)
        .bind(&log.resource_id)
        .bind(&log.severity)
        .bind(&log.before_state)
        .bind(&log.after_state)
        .bind(&log.metadata)
        .fetch_one(executor)
        .await
}

pub async fn create(pool: &PgPool, log: &NewAuditLog) -> Result<AuditLog, sqlx::Error> {
    insert_row(pool, log).await
}

/// Inserts every row in one transaction. Nothing is committed if any row fails.
pub async fn create_many(pool: &PgPool, logs: &[NewAuditLog]) -> Result<Vec<AuditLog>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = Vec::with_capacity(logs.len());
    for log in logs {
        inserted.push(insert_row(&mut *tx, log).await?);
    }
    tx.commit().await?;
    Ok(inserted)
}

pub async fn find_by_id_scoped(
    pool: &PgPool,
    id: Uuid,
    tenant_id: Uuid,
) -> Result<Option<AuditLog>, sqlx::Error> {
    sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: &LogFilter,
) -> Result<Vec<AuditLog>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM audit_logs");
    push_filters(&mut query, tenant_id, filter);
    query.push(" ORDER BY created_at ASC, id ASC");

    query.build_query_as::<AuditLog>().fetch_all(pool).await
}

pub async fn list_for_export(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<AuditLog>, sqlx::Error> {
    sqlx::query_as::<_, AuditLog>(
        "SELECT * FROM audit_logs WHERE tenant_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, tenant_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_by_action(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<ActionCount>, sqlx::Error> {
    sqlx::query_as::<_, ActionCount>(
        "SELECT action_type, COUNT(*) AS count FROM audit_logs
         WHERE tenant_id = $1
         GROUP BY action_type
         ORDER BY count DESC, action_type ASC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

pub async fn count_by_severity(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Vec<SeverityCount>, sqlx::Error> {
    sqlx::query_as::<_, SeverityCount>(
        "SELECT severity, COUNT(*) AS count FROM audit_logs
         WHERE tenant_id = $1
         GROUP BY severity
         ORDER BY count DESC, severity ASC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

/// Per-day counts (UTC days) of events created at or after `since`.
pub async fn count_per_day(
    pool: &PgPool,
    tenant_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<DayCount>, sqlx::Error> {
    sqlx::query_as::<_, DayCount>(
        "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count
         FROM audit_logs
         WHERE tenant_id = $1 AND created_at >= $2
         GROUP BY day
         ORDER BY day ASC",
    )
    .bind(tenant_id)
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn delete_all(pool: &PgPool, tenant_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM audit_logs WHERE tenant_id = $1")
        .bind(tenant_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Returns false when no row with this id exists in the tenant.
pub async fn delete_scoped(pool: &PgPool, id: Uuid, tenant_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM audit_logs WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(tenant_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, tenant_id: Uuid, filter: &LogFilter) {
    query.push(" WHERE tenant_id = ").push_bind(tenant_id);

    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }

    for (column, value) in [
        ("session_id", &filter.session_id),
        ("action_type", &filter.action_type),
        ("resource_type", &filter.resource_type),
        ("severity", &filter.severity),
    ] {
        if let Some(value) = value {
            query.push(format!(" AND {column} = ")).push_bind(value.clone());
        }
    }

    if let Some(text) = filter.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(text));
        query
            .push(" AND (resource_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR metadata::text ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escapes LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
