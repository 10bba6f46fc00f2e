use sqlx::PgPool;

use crate::models::Tenant;

pub async fn create(pool: &PgPool, name: &str, status: &str) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, status) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at ASC, id ASC")
        .fetch_all(pool)
        .await
}
