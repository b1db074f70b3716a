mod auth;
mod error;
pub mod http;
mod jwt;

pub use auth::{AdminUser, CurrentUser};
pub use error::{ApiError, ApiResult};
pub use jwt::JwtServiceImpl;
