use std::convert::Infallible;

use futures_util::stream::{self, Stream};

use crate::models::AuditLog;

/// CSV lines for an export: a header row followed by one row per log, or
/// nothing at all when there are no logs.
pub fn csv_stream(logs: Vec<AuditLog>) -> impl Stream<Item = Result<String, Infallible>> {
    let header = (!logs.is_empty()).then(header_line);
    let rows = logs.into_iter().map(|log| row_line(&log));
    stream::iter(header.into_iter().chain(rows).map(Ok))
}

fn header_line() -> String {
    join_line(AuditLog::COLUMNS.iter().map(|c| c.to_string()))
}

fn row_line(log: &AuditLog) -> String {
    join_line([
        log.id.to_string(),
        log.tenant_id.to_string(),
        log.user_id.to_string(),
        log.session_id.clone(),
        log.ip_address.clone(),
        log.user_agent.clone(),
        log.action_type.clone(),
        log.resource_type.clone(),
        log.resource_id.clone(),
        log.severity.clone(),
        json_cell(&log.before_state),
        json_cell(&log.after_state),
        json_cell(&log.metadata),
        log.created_at.to_rfc3339(),
    ])
}

fn json_cell(value: &Option<serde_json::Value>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn join_line(cells: impl IntoIterator<Item = String>) -> String {
    let mut line = cells
        .into_iter()
        .map(|cell| csv_escape(&cell))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
