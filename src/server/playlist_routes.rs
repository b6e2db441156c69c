use super::api_response::{success_data, success_message, ApiJson, ApiResult};
use super::session::Session;
use super::state::{GuardedPlaylistManager, ServerState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
struct CreatePlaylistBody {
    pub name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PlaylistSongBody {
    pub song_id: String,
}

async fn post_playlist(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    ApiJson(body): ApiJson<CreatePlaylistBody>,
) -> ApiResult<Response> {
    let playlist_id = playlists.create_playlist(&session.user_id, &body.name)?;
    Ok(success_data(
        StatusCode::CREATED,
        json!({ "playlistId": playlist_id }),
    ))
}

async fn get_playlists(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
) -> ApiResult<Response> {
    let found = playlists.list_playlists(&session.user_id)?;
    Ok(success_data(StatusCode::OK, json!({ "playlists": found })))
}

async fn delete_playlist(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    playlists.delete_playlist(&session.user_id, &id)?;
    Ok(success_message(StatusCode::OK, "Playlist deleted"))
}

// =========================================================================
// Songs and activities
// =========================================================================

async fn post_playlist_song(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PlaylistSongBody>,
) -> ApiResult<Response> {
    playlists.add_song(&session.user_id, &id, &body.song_id)?;
    Ok(success_message(
        StatusCode::CREATED,
        "Song added to playlist",
    ))
}

async fn get_playlist_songs(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let playlist = playlists.list_songs(&session.user_id, &id)?;
    Ok(success_data(StatusCode::OK, json!({ "playlist": playlist })))
}

async fn delete_playlist_song(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PlaylistSongBody>,
) -> ApiResult<Response> {
    playlists.remove_song(&session.user_id, &id, &body.song_id)?;
    Ok(success_message(
        StatusCode::OK,
        "Song removed from playlist",
    ))
}

async fn get_playlist_activities(
    session: Session,
    State(playlists): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let activities = playlists.list_activities(&session.user_id, &id)?;
    Ok(success_data(
        StatusCode::OK,
        json!({ "playlistId": id, "activities": activities }),
    ))
}

pub fn playlist_routes() -> Router<ServerState> {
    Router::new()
        .route("/playlists", post(post_playlist).get(get_playlists))
        .route("/playlists/{id}", delete(delete_playlist))
        .route(
            "/playlists/{id}/songs",
            post(post_playlist_song)
                .get(get_playlist_songs)
                .delete(delete_playlist_song),
        )
        .route("/playlists/{id}/activities", get(get_playlist_activities))
}
