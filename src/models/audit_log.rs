use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub action_type: String,
    pub resource_type: String,
    pub resource_id: String,
    pub severity: String,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Column names in the order they are exported.
    pub const COLUMNS: [&'static str; 14] = [
        "id",
        "tenant_id",
        "user_id",
        "session_id",
        "ip_address",
        "user_agent",
        "action_type",
        "resource_type",
        "resource_id",
        "severity",
        "before_state",
        "after_state",
        "metadata",
        "created_at",
    ];
}

/// An audit event as declared by the caller. Server-assigned fields (`id`,
/// `created_at`) are not part of it and are ignored if present in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditLog {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub action_type: String,
    pub resource_type: String,
    pub resource_id: String,
    pub severity: String,
    #[serde(default)]
    pub before_state: Option<serde_json::Value>,
    #[serde(default)]
    pub after_state: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NewAuditLog {
    /// Payload documents must be JSON objects when present.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("before_state", &self.before_state),
            ("after_state", &self.after_state),
            ("metadata", &self.metadata),
        ] {
            match value {
                None | Some(serde_json::Value::Object(_)) => {}
                Some(_) => return Err(format!("{name} must be an object or null")),
            }
        }
        Ok(())
    }
}
