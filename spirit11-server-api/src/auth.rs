use axum::{
    RequestPartsExt,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use log::{debug, warn};
use spirit11_server_domain::{
    ServiceError,
    account::{AccountService, User},
    app::AppState,
};

use crate::ApiError;

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// The authenticated caller.
pub struct CurrentUser(pub User);

/// An authenticated caller holding the admin role.
pub struct AdminUser(pub User);

async fn extract_token(parts: &mut Parts) -> Option<String> {
    if let Some(token) = parts
        .headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }
    if let Ok(TypedHeader(Authorization(bearer))) =
        parts.extract::<TypedHeader<Authorization<Bearer>>>().await
    {
        return Some(bearer.token().to_string());
    }
    // a bare token without the Bearer scheme
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(parts).await else {
            return Err(ServiceError::Forbidden("No token provided".into()).into());
        };
        let user = app.account_service.authenticate(&token).await?;
        debug!("Authenticated user {} for {}", user.id, parts.uri);
        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, app).await?;
        if !user.is_admin {
            warn!("User {} denied admin access to {}", user.id, parts.uri);
            return Err(ServiceError::Forbidden("Requires Admin Role".into()).into());
        }
        Ok(AdminUser(user))
    }
}
