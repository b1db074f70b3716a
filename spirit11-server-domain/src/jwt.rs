use std::sync::Arc;

use crate::{ServiceError, ServiceResult, UserId};

pub type ArcJwtService = Arc<Box<dyn JwtService + Send + Sync>>;

pub trait JwtService {
    fn generate_jwt(&self, user_id: UserId) -> ServiceResult<String>;
    fn validate_jwt(&self, token: &str) -> ServiceResult<UserId>;
}

/// Issues `token-<id>` strings. Only meant for tests.
#[derive(Default, Clone)]
pub struct MockJwtService;

impl JwtService for MockJwtService {
    fn generate_jwt(&self, user_id: UserId) -> ServiceResult<String> {
        Ok(format!("token-{}", user_id))
    }

    fn validate_jwt(&self, token: &str) -> ServiceResult<UserId> {
        token
            .strip_prefix("token-")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Invalid token".into()))
    }
}
