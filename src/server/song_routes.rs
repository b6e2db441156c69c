use super::api_response::{success_data, success_message, ApiJson, ApiResult};
use super::state::{GuardedSongManager, ServerState};
use crate::store::{SongDraft, SongFilter};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SongBody {
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i64>,
    pub album_id: Option<String>,
}

impl From<SongBody> for SongDraft {
    fn from(body: SongBody) -> Self {
        SongDraft {
            title: body.title,
            year: body.year,
            genre: body.genre,
            performer: body.performer,
            duration: body.duration,
            album_id: body.album_id,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct SongSearchQuery {
    pub title: Option<String>,
    pub performer: Option<String>,
}

async fn post_song(
    State(songs): State<GuardedSongManager>,
    ApiJson(body): ApiJson<SongBody>,
) -> ApiResult<Response> {
    let song_id = songs.create_song(&body.into())?;
    Ok(success_data(
        StatusCode::CREATED,
        json!({ "songId": song_id }),
    ))
}

async fn search_songs(
    State(songs): State<GuardedSongManager>,
    Query(query): Query<SongSearchQuery>,
) -> ApiResult<Response> {
    let filter = SongFilter {
        title: query.title.filter(|t| !t.is_empty()),
        performer: query.performer.filter(|p| !p.is_empty()),
    };
    let found = songs.search_songs(&filter)?;
    Ok(success_data(StatusCode::OK, json!({ "songs": found })))
}

async fn get_song(
    State(songs): State<GuardedSongManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let song = songs.get_song(&id)?;
    Ok(success_data(StatusCode::OK, json!({ "song": song })))
}

async fn put_song(
    State(songs): State<GuardedSongManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SongBody>,
) -> ApiResult<Response> {
    songs.update_song(&id, &body.into())?;
    Ok(success_message(StatusCode::OK, "Song updated"))
}

async fn delete_song(
    State(songs): State<GuardedSongManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    songs.delete_song(&id)?;
    Ok(success_message(StatusCode::OK, "Song deleted"))
}

pub fn song_routes() -> Router<ServerState> {
    Router::new()
        .route("/songs", get(search_songs).post(post_song))
        .route(
            "/songs/{id}",
            get(get_song).put(put_song).delete(delete_song),
        )
}
