use super::api_response::{success_data, ApiJson, ApiResult};
use super::state::{GuardedUserManager, ServerState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
struct RegisterUserBody {
    pub username: String,
    pub password: String,
    pub fullname: String,
}

async fn post_user(
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<RegisterUserBody>,
) -> ApiResult<Response> {
    let user_id = user_manager.register(&body.username, &body.password, &body.fullname)?;
    Ok(success_data(
        StatusCode::CREATED,
        json!({ "userId": user_id }),
    ))
}

async fn get_user(
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let user = user_manager.get_user(&id)?;
    Ok(success_data(
        StatusCode::OK,
        json!({ "user": { "id": user.id, "username": user.username, "fullname": user.fullname } }),
    ))
}

pub fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/users", post(post_user))
        .route("/users/{id}", get(get_user))
}
