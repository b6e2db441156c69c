use super::api_response::{success_data, success_message, ApiJson, ApiResult};
use super::metrics::record_login_attempt;
use super::state::{GuardedUserManager, ServerState};
use axum::{extract::State, http::StatusCode, response::Response, routing::post, Router};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::info;

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenBody {
    pub refresh_token: String,
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult<Response> {
    let start = Instant::now();
    let result = user_manager.login(&body.username, &body.password);
    record_login_attempt(
        if result.is_ok() { "success" } else { "failure" },
        start.elapsed(),
    );

    let tokens = result?;
    info!("User {} logged in", body.username);
    Ok(success_data(
        StatusCode::CREATED,
        json!({ "accessToken": tokens.access_token, "refreshToken": tokens.refresh_token }),
    ))
}

async fn refresh(
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<RefreshTokenBody>,
) -> ApiResult<Response> {
    let access_token = user_manager.refresh_access_token(&body.refresh_token)?;
    Ok(success_data(
        StatusCode::OK,
        json!({ "accessToken": access_token }),
    ))
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<RefreshTokenBody>,
) -> ApiResult<Response> {
    user_manager.logout(&body.refresh_token)?;
    Ok(success_message(StatusCode::OK, "Refresh token deleted"))
}

pub fn auth_routes() -> Router<ServerState> {
    Router::new().route(
        "/authentications",
        post(login).put(refresh).delete(logout),
    )
}
