pub mod extractor;
pub mod jwt;

pub use extractor::{AdminUser, AuthUser, Role};
