pub mod logs;
pub mod stream;
pub mod tenants;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::SharedState;

pub const API_PREFIX: &str = "/api/v1";

pub fn api_routes() -> Router<SharedState> {
    let routes = Router::new()
        // Audit logs
        .route("/logs", get(logs::search).post(logs::create))
        .route("/logs/", get(logs::search).post(logs::create))
        .route("/logs/bulk", post(logs::create_bulk))
        .route("/logs/stats", get(logs::stats))
        .route("/logs/export", get(logs::export))
        .route("/logs/stream", get(stream::subscribe))
        .route("/logs/cleanup", delete(logs::delete_all))
        .route("/logs/cleanup/{id}", delete(logs::delete_one))
        .route("/logs/{id}", get(logs::get))
        // Tenants
        .route("/tenants", get(tenants::list).post(tenants::create))
        .route("/tenants/", get(tenants::list).post(tenants::create));

    Router::new().nest(API_PREFIX, routes)
}
