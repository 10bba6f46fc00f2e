pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod fanout;
pub mod hub;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::state::{AppState, SharedState};

/// Connects the configured fan-out sinks and builds the router.
pub async fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    let hub = Arc::new(BroadcastHub::new());
    let dispatcher = fanout::build_dispatcher(&config, hub.clone()).await;
    tracing::info!("Fan-out sinks: {:?}", dispatcher.sink_names());

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        hub,
        dispatcher,
    });

    (router(state.clone()), state)
}

pub fn router(state: SharedState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                )),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
