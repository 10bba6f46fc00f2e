pub mod audit_logs;
pub mod tenants;
