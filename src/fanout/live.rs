use std::sync::Arc;

use async_trait::async_trait;

use super::{EventSink, SinkError};
use crate::hub::BroadcastHub;
use crate::models::AuditLog;

/// Pushes committed events to the live subscribers of the event's tenant.
pub struct LiveSink {
    hub: Arc<BroadcastHub>,
}

impl LiveSink {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventSink for LiveSink {
    fn name(&self) -> &str {
        "live"
    }

    async fn deliver(&self, event: &AuditLog) -> Result<(), SinkError> {
        let message = serde_json::to_string(event)?;
        let delivered = self.hub.broadcast(event.tenant_id, &message);
        tracing::trace!("Event {} pushed to {delivered} live subscribers", event.id);
        Ok(())
    }
}
