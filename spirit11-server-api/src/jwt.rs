use std::sync::LazyLock;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::warn;
use serde::{Deserialize, Serialize};
use spirit11_server_domain::{ServiceError, ServiceResult, UserId, jwt::JwtService};
use uuid::Uuid;

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    exp: usize,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

static KEYS: LazyLock<Keys> = LazyLock::new(|| {
    let secret = read_or_generate_secret();
    Keys::new(&secret)
});

fn read_or_generate_secret() -> Vec<u8> {
    match std::env::var("SPIRIT11_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret.into_bytes(),
        _ => {
            warn!("SPIRIT11_JWT_SECRET not set, generating a random one");
            Uuid::new_v4().as_bytes().to_vec()
        }
    }
}

#[derive(Default, Clone)]
pub struct JwtServiceImpl;

impl JwtService for JwtServiceImpl {
    fn generate_jwt(&self, user_id: UserId) -> ServiceResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp()
                as usize,
        };
        encode(&Header::default(), &claims, &KEYS.encoding)
            .map_err(|e| ServiceError::Internal(format!("Failed to sign token: {}", e)))
    }

    fn validate_jwt(&self, token: &str) -> ServiceResult<UserId> {
        decode::<Claims>(token, &KEYS.decoding, &Validation::default())
            .ok()
            .and_then(|data| data.claims.sub.parse().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Unauthorized: Invalid token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let service = JwtServiceImpl;
        let token = service.generate_jwt(42).unwrap();
        assert_eq!(service.validate_jwt(&token).unwrap(), 42);
    }

    #[test]
    fn test_rejects_garbage() {
        let service = JwtServiceImpl;
        assert!(matches!(
            service.validate_jwt("not.a.token"),
            Err(ServiceError::Unauthorized(_))
        ));

        let expired = Claims {
            sub: "42".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &expired, &KEYS.encoding).unwrap();
        assert!(service.validate_jwt(&token).is_err());
    }
}
