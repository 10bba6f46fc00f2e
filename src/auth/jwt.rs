use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token payload. Claim names match the tokens already issued to clients
/// (`sub`, `tenant_id`, `role`, `exp`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub tenant_id: Uuid,
    pub role: String,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: impl Into<String>, tenant_id: Uuid, role: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sub: subject.into(),
            tenant_id,
            role: role.into(),
            exp: (Utc::now() + ttl).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

/// Verifies signature and expiry (HS256). Tokens missing any claim fail here.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn round_trips_valid_token() {
        let claims = Claims::new("user123", Uuid::new_v4(), "admin", Duration::hours(1));
        let token = encode_token(&claims, SECRET).unwrap();
        assert_eq!(decode_token(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn rejects_wrong_secret() {
        let claims = Claims::new("user123", Uuid::new_v4(), "member", Duration::hours(1));
        let token = encode_token(&claims, SECRET).unwrap();
        assert!(decode_token(&token, "another-secret").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        // Past the default 60s leeway.
        let claims = Claims::new("user123", Uuid::new_v4(), "member", Duration::minutes(-5));
        let token = encode_token(&claims, SECRET).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }

    #[test]
    fn rejects_token_without_tenant() {
        #[derive(Serialize)]
        struct Partial {
            sub: String,
            role: String,
            exp: i64,
        }
        let partial = Partial {
            sub: "user123".into(),
            role: "admin".into(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &partial,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }
}
