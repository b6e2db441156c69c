use super::api_response::{success_data, success_message, ApiJson, ApiResult};
use super::session::Session;
use super::state::{GuardedPlaylistManager, ServerState};
use axum::{extract::State, http::StatusCode, response::Response, routing::post, Router};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CollaborationBody {
    pub playlist_id: String,
    pub user_id: String,
}

async fn post_collaboration(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    ApiJson(body): ApiJson<CollaborationBody>,
) -> ApiResult<Response> {
    let collaboration_id = playlists.authorizer().add_collaborator(
        &session.user_id,
        &body.playlist_id,
        &body.user_id,
    )?;
    Ok(success_data(
        StatusCode::CREATED,
        json!({ "collaborationId": collaboration_id }),
    ))
}

async fn delete_collaboration(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    ApiJson(body): ApiJson<CollaborationBody>,
) -> ApiResult<Response> {
    playlists.authorizer().remove_collaborator(
        &session.user_id,
        &body.playlist_id,
        &body.user_id,
    )?;
    Ok(success_message(StatusCode::OK, "Collaborator removed"))
}

pub fn collaboration_routes() -> Router<ServerState> {
    Router::new().route(
        "/collaborations",
        post(post_collaboration).delete(delete_collaboration),
    )
}
