use std::time::Duration;

use async_trait::async_trait;

use super::{EventSink, SinkError};
use crate::config::SearchConfig;
use crate::models::AuditLog;

/// Indexes events through the `PUT /<index>/_doc/<id>` document API. Using
/// the event id as document id makes repeated deliveries overwrite.
pub struct SearchIndexSink {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl SearchIndexSink {
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::from(format!("Failed to build search client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
        })
    }

    fn document_url(&self, event: &AuditLog) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, event.id)
    }
}

#[async_trait]
impl EventSink for SearchIndexSink {
    fn name(&self) -> &str {
        "search"
    }

    async fn deliver(&self, event: &AuditLog) -> Result<(), SinkError> {
        let url = self.document_url(event);
        let resp = self
            .client
            .put(&url)
            .json(event)
            .send()
            .await
            .map_err(|e| SinkError::from(format!("Index request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(512)
            .collect::<String>();
        Err(SinkError::from(format!("Index returned {status}: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::testing::sample_event;

    #[test]
    fn document_url_uses_event_id() {
        let config = SearchConfig {
            url: "http://search.local:9200/".to_string(),
            index: "audit-logs".to_string(),
        };
        let sink = SearchIndexSink::new(&config, Duration::from_secs(5)).unwrap();
        let event = sample_event(uuid::Uuid::new_v4());
        assert_eq!(
            sink.document_url(&event),
            format!("http://search.local:9200/audit-logs/_doc/{}", event.id)
        );
    }

    #[tokio::test]
    async fn unreachable_index_is_a_delivery_error() {
        let config = SearchConfig {
            url: "http://127.0.0.1:9".to_string(),
            index: "audit-logs".to_string(),
        };
        let sink = SearchIndexSink::new(&config, Duration::from_secs(2)).unwrap();
        let event = sample_event(uuid::Uuid::new_v4());
        assert!(sink.deliver(&event).await.is_err());
    }
}
