use axum::{Json, extract::State, http::StatusCode};
use log::info;
use serde::{Deserialize, Serialize};
use spirit11_server_domain::{
    UserId,
    account::{AccountService, Credentials},
    app::AppState,
};

use crate::ApiResult;

#[derive(Deserialize, Debug)]
pub struct JsonSignup {
    username: String,
    password: String,
    university: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct JsonUserRef {
    id: UserId,
    username: String,
}

#[derive(Serialize, Debug)]
pub struct JsonSignupResponse {
    message: &'static str,
    user: JsonUserRef,
    #[serde(rename = "accessToken")]
    access_token: String,
}

pub async fn signup(
    State(app): State<AppState>,
    Json(body): Json<JsonSignup>,
) -> ApiResult<(StatusCode, Json<JsonSignupResponse>)> {
    let session = app
        .account_service
        .signup(
            Credentials {
                username: body.username,
                password: body.password,
            },
            body.university,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(JsonSignupResponse {
            message: "User registered successfully",
            user: JsonUserRef {
                id: session.user.id,
                username: session.user.username,
            },
            access_token: session.access_token,
        }),
    ))
}

#[derive(Deserialize, Debug)]
pub struct JsonLogin {
    username: String,
    password: String,
}

#[derive(Serialize, Debug)]
pub struct JsonLoginResponse {
    id: UserId,
    username: String,
    is_admin: bool,
    #[serde(rename = "accessToken")]
    access_token: String,
}

pub async fn login(
    State(app): State<AppState>,
    Json(body): Json<JsonLogin>,
) -> ApiResult<Json<JsonLoginResponse>> {
    let session = app
        .account_service
        .login(&body.username, &body.password)
        .await?;
    info!("User {} logged in", session.user.id);
    Ok(Json(JsonLoginResponse {
        id: session.user.id,
        username: session.user.username,
        is_admin: session.user.is_admin,
        access_token: session.access_token,
    }))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JsonCreateAdmin {
    username: String,
    password: String,
    #[serde(default)]
    secret_key: String,
}

#[derive(Serialize, Debug)]
pub struct JsonAdminRef {
    id: UserId,
    username: String,
    is_admin: bool,
}

#[derive(Serialize, Debug)]
pub struct JsonCreateAdminResponse {
    message: &'static str,
    user: JsonAdminRef,
}

pub async fn create_admin(
    State(app): State<AppState>,
    Json(body): Json<JsonCreateAdmin>,
) -> ApiResult<(StatusCode, Json<JsonCreateAdminResponse>)> {
    let user = app
        .account_service
        .create_admin(
            Credentials {
                username: body.username,
                password: body.password,
            },
            &body.secret_key,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(JsonCreateAdminResponse {
            message: "Admin user created successfully",
            user: JsonAdminRef {
                id: user.id,
                username: user.username,
                is_admin: user.is_admin,
            },
        }),
    ))
}
