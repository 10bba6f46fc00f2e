#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use auditlog::auth::jwt::{self, Claims};
use auditlog::config::Config;
use auditlog::fanout::live::LiveSink;
use auditlog::fanout::{EventSink, FanoutDispatcher, SinkError};
use auditlog::hub::BroadcastHub;
use auditlog::models::AuditLog;
use auditlog::state::{AppState, SharedState};

pub const JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: std::net::SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub state: SharedState,
}

/// Records every event the dispatcher hands to it.
pub struct RecordingSink {
    pub received: Mutex<Vec<AuditLog>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Waits until at least `n` events arrived (or gives up after 5s).
    pub async fn wait_for(&self, n: usize) -> Vec<AuditLog> {
        for _ in 0..100 {
            if self.len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, event: &AuditLog) -> Result<(), SinkError> {
        self.received.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Always fails, like an unreachable broker.
pub struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _event: &AuditLog) -> Result<(), SinkError> {
        Err(SinkError::from("broker unavailable"))
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/api/v1{}", self.addr, path)
    }

    pub fn ws_url(&self, tenant_id: Uuid) -> String {
        format!("ws://{}/api/v1/logs/stream?tenant_id={tenant_id}", self.addr)
    }

    pub fn token(&self, tenant_id: Uuid, role: &str) -> String {
        let claims = Claims::new("user123", tenant_id, role, chrono::Duration::hours(1));
        jwt::encode_token(&claims, JWT_SECRET).unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token(Uuid::new_v4(), "admin")
    }

    /// Registers a tenant through the API and returns its id.
    pub async fn create_tenant(&self, name: &str) -> Uuid {
        let (body, status) = self
            .post_auth("/tenants/", &self.admin_token(), &json!({ "name": name, "status": "active" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create tenant failed: {body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn count_rows(&self, tenant_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_logs WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Waits until the hub has `n` subscribers for the tenant.
    pub async fn wait_for_subscribers(&self, tenant_id: Uuid, n: usize) {
        for _ in 0..100 {
            if self.state.hub.subscriber_count(tenant_id) == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {n} subscribers for {tenant_id}, found {}",
            self.state.hub.subscriber_count(tenant_id)
        );
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> StatusCode {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed")
            .status()
    }
}

pub fn sample_log(tenant_id: Uuid) -> Value {
    json!({
        "tenant_id": tenant_id,
        "user_id": Uuid::new_v4(),
        "session_id": "sess-test-001",
        "ip_address": "127.0.0.1",
        "user_agent": "test-client/1.0",
        "action_type": "CREATE",
        "resource_type": "test_resource",
        "resource_id": "res-123",
        "severity": "INFO",
        "before_state": { "foo": "bar" },
        "after_state": { "foo": "baz" },
        "metadata": { "test_meta": true }
    })
}

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        db_max_connections: 5,
        jwt_secret: JWT_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        queue: None,
        search: None,
        sink_timeout: Duration::from_secs(2),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_sinks(Vec::new()).await
}

/// Spawn a test app with a fresh temporary database. `sinks` are registered
/// next to the live channel in place of the queue and search sinks.
pub async fn spawn_app_with_sinks(sinks: Vec<Arc<dyn EventSink>>) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let db_name = format!("auditlog_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = test_config(test_url);
    let hub = Arc::new(BroadcastHub::new());
    let mut dispatcher = FanoutDispatcher::new(config.sink_timeout);
    for sink in sinks {
        dispatcher.register(sink);
    }
    dispatcher.register(Arc::new(LiveSink::new(hub.clone())));

    let state: SharedState = Arc::new(AppState {
        pool: pool.clone(),
        config,
        hub,
        dispatcher,
    });
    let app = auditlog::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
        state,
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
