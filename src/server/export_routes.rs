use super::api_response::{success_message, ApiJson, ApiResult};
use super::metrics::record_export_request;
use super::session::Session;
use super::state::{GuardedPlaylistManager, ServerState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Router,
};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ExportPlaylistBody {
    pub target_email: String,
}

async fn post_export_playlist(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ExportPlaylistBody>,
) -> ApiResult<Response> {
    let result = playlists.request_export(&session.user_id, &id, &body.target_email);
    record_export_request(if result.is_ok() { "accepted" } else { "rejected" });
    result?;
    Ok(success_message(
        StatusCode::CREATED,
        "Your request is being processed",
    ))
}

pub fn export_routes() -> Router<ServerState> {
    Router::new().route("/export/playlists/{id}", post(post_export_playlist))
}
