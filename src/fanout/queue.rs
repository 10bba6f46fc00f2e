use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::{EventSink, SinkError};
use crate::config::QueueConfig;
use crate::models::AuditLog;

/// Publishes each event to NATS on `<subject>.<tenant_id>`.
pub struct NatsQueueSink {
    client: async_nats::Client,
    subject: String,
}

impl NatsQueueSink {
    /// Returns immediately; the client keeps retrying the initial connection
    /// in the background.
    pub async fn connect(config: &QueueConfig) -> Result<Self, SinkError> {
        let client = async_nats::ConnectOptions::new()
            .retry_on_initial_connect()
            .connect(config.url.as_str())
            .await
            .map_err(|e| SinkError::from(format!("NATS connect to {} failed: {e}", config.url)))?;

        tracing::info!("Queue sink connected to NATS at {}", config.url);

        Ok(Self {
            client,
            subject: config.subject.clone(),
        })
    }
}

fn subject_for(prefix: &str, tenant_id: Uuid) -> String {
    format!("{prefix}.{tenant_id}")
}

#[async_trait]
impl EventSink for NatsQueueSink {
    fn name(&self) -> &str {
        "queue"
    }

    async fn deliver(&self, event: &AuditLog) -> Result<(), SinkError> {
        let payload = Bytes::from(serde_json::to_vec(event)?);
        let subject = subject_for(&self.subject, event.tenant_id);

        self.client
            .publish(subject.clone(), payload)
            .await
            .map_err(|e| SinkError::from(format!("Publish to {subject} failed: {e}")))?;
        self.client
            .flush()
            .await
            .map_err(|e| SinkError::from(format!("Flush after publish to {subject} failed: {e}")))?;
        Ok(())
    }
}
