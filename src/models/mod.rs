mod audit_log;
mod tenant;

pub use audit_log::{AuditLog, NewAuditLog};
pub use tenant::Tenant;
