use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub log_level: String,
    pub queue: Option<QueueConfig>,
    pub search: Option<SearchConfig>,
    pub sink_timeout: Duration,
}

/// NATS subject prefix the queue sink publishes under (`<subject>.<tenant_id>`).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub url: String,
    pub subject: String,
}

/// Elasticsearch/OpenSearch-compatible document API.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub index: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let db_max_connections: u32 = env_or("AUDITLOG_DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid AUDITLOG_DB_MAX_CONNECTIONS: {e}"))?;

        let host: IpAddr = env_or("AUDITLOG_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid AUDITLOG_HOST: {e}"))?;

        let port: u16 = env_or("AUDITLOG_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid AUDITLOG_PORT: {e}"))?;

        let max_body_size: usize = env_or("AUDITLOG_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid AUDITLOG_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("AUDITLOG_LOG_LEVEL", "info");

        let queue = std::env::var("AUDITLOG_NATS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| QueueConfig {
                url,
                subject: env_or("AUDITLOG_NATS_SUBJECT", "audit.logs"),
            });

        let search = std::env::var("AUDITLOG_SEARCH_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| SearchConfig {
                url: url.trim_end_matches('/').to_string(),
                index: env_or("AUDITLOG_SEARCH_INDEX", "audit-logs"),
            });

        let sink_timeout = parse_secs(&env_or("AUDITLOG_SINK_TIMEOUT_SECS", "10"))
            .map_err(|e| format!("Invalid AUDITLOG_SINK_TIMEOUT_SECS: {e}"))?;

        Ok(Config {
            database_url,
            db_max_connections,
            jwt_secret,
            host,
            port,
            max_body_size,
            log_level,
            queue,
            search,
            sink_timeout,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_secs(raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw.trim().parse().map_err(|e| format!("{e}"))?;
    if secs == 0 {
        return Err("must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_secs_accepts_positive_values() {
        assert_eq!(parse_secs("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_secs(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_secs_rejects_zero_and_garbage() {
        assert!(parse_secs("0").is_err());
        assert!(parse_secs("soon").is_err());
    }

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or("AUDITLOG_TEST_SURELY_UNSET_KEY", "fallback"), "fallback");
    }
}
