pub mod live;
pub mod queue;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::models::AuditLog;

/// A failed delivery to one downstream channel. Logged where the delivery
/// task ends; it never converts into a request error.
#[derive(Debug)]
pub struct SinkError {
    pub message: String,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SinkError {}

impl From<String> for SinkError {
    fn from(s: String) -> Self {
        SinkError { message: s }
    }
}

impl From<&str> for SinkError {
    fn from(s: &str) -> Self {
        SinkError {
            message: s.to_string(),
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError {
            message: format!("Failed to encode event: {err}"),
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, event: &AuditLog) -> Result<(), SinkError>;
}

/// Hands each committed event to every registered sink on its own task.
pub struct FanoutDispatcher {
    sinks: Vec<Arc<dyn EventSink>>,
    timeout: Duration,
}

impl FanoutDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sinks: Vec::new(),
            timeout,
        }
    }

    pub fn register(&mut self, sink: Arc<dyn EventSink>) {
        tracing::info!("Fan-out sink registered: {}", sink.name());
        self.sinks.push(sink);
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Spawns one detached delivery per sink and returns immediately. The
    /// handles are only useful to callers that want to wait (tests).
    pub fn publish(&self, event: AuditLog) -> Vec<JoinHandle<()>> {
        let event = Arc::new(event);
        self.sinks
            .iter()
            .map(|sink| {
                let sink = Arc::clone(sink);
                let event = Arc::clone(&event);
                let timeout = self.timeout;
                tokio::spawn(async move { deliver(sink.as_ref(), &event, timeout).await })
            })
            .collect()
    }
}

async fn deliver(sink: &dyn EventSink, event: &AuditLog, timeout: Duration) {
    match tokio::time::timeout(timeout, sink.deliver(event)).await {
        Ok(Ok(())) => {
            tracing::debug!("Event {} delivered to {}", event.id, sink.name());
        }
        Ok(Err(e)) => {
            tracing::warn!("Delivery of event {} to {} failed: {e}", event.id, sink.name());
        }
        Err(_) => {
            tracing::warn!(
                "Delivery of event {} to {} timed out after {timeout:?}",
                event.id,
                sink.name()
            );
        }
    }
}

/// Builds the dispatcher from configuration. Channels whose backing service
/// is not configured are left out; the live channel is always present.
pub async fn build_dispatcher(config: &Config, hub: Arc<BroadcastHub>) -> FanoutDispatcher {
    let mut dispatcher = FanoutDispatcher::new(config.sink_timeout);

    if let Some(queue) = &config.queue {
        match queue::NatsQueueSink::connect(queue).await {
            Ok(sink) => dispatcher.register(Arc::new(sink)),
            Err(e) => tracing::warn!("Queue sink not available: {e}"),
        }
    }

    if let Some(search) = &config.search {
        match search::SearchIndexSink::new(search, config.sink_timeout) {
            Ok(sink) => dispatcher.register(Arc::new(sink)),
            Err(e) => tracing::warn!("Search sink not available: {e}"),
        }
    }

    dispatcher.register(Arc::new(live::LiveSink::new(hub)));
    dispatcher
}
