use super::api_response::{success_data, success_message, ApiError, ApiJson, ApiResult};
use super::metrics::record_cache_lookup;
use super::session::Session;
use super::state::{GuardedAlbumManager, GuardedFileStorage, ServerState};
use super::ServerConfig;
use crate::cache::DataSource;
use crate::store::AlbumDraft;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{HeaderValue, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const DATA_SOURCE_HEADER: &str = "x-data-source";
const COVER_FIELD: &str = "cover";
const COVERS_NAMESPACE: &str = "covers";

#[derive(Deserialize, Debug)]
struct AlbumBody {
    pub name: String,
    pub year: i32,
}

impl From<AlbumBody> for AlbumDraft {
    fn from(body: AlbumBody) -> Self {
        AlbumDraft {
            name: body.name,
            year: body.year,
        }
    }
}

/// Tags responses served from the cache so clients can tell.
fn tag_source(mut response: Response, source: DataSource) -> Response {
    if source == DataSource::Cache {
        response.headers_mut().insert(
            DATA_SOURCE_HEADER,
            HeaderValue::from_static(DataSource::Cache.as_str()),
        );
    }
    response
}

// =========================================================================
// Album CRUD
// =========================================================================

async fn post_album(
    State(albums): State<GuardedAlbumManager>,
    ApiJson(body): ApiJson<AlbumBody>,
) -> ApiResult<Response> {
    let album_id = albums.create_album(&body.into())?;
    Ok(success_data(
        StatusCode::CREATED,
        json!({ "albumId": album_id }),
    ))
}

async fn get_album(
    State(albums): State<GuardedAlbumManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let album = albums.get_album_by_id(&id)?;
    record_cache_lookup("album_with_songs", album.source);
    let response = success_data(StatusCode::OK, json!({ "album": album.value }));
    Ok(tag_source(response, album.source))
}

async fn put_album(
    State(albums): State<GuardedAlbumManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AlbumBody>,
) -> ApiResult<Response> {
    albums.update_album(&id, &body.into())?;
    Ok(success_message(StatusCode::OK, "Album updated"))
}

async fn delete_album(
    State(albums): State<GuardedAlbumManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    albums.delete_album(&id)?;
    Ok(success_message(StatusCode::OK, "Album deleted"))
}

// =========================================================================
// Likes
// =========================================================================

async fn post_like(
    session: Session,
    State(albums): State<GuardedAlbumManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    albums.add_like(&session.user_id, &id)?;
    Ok(success_message(StatusCode::CREATED, "Album liked"))
}

async fn delete_like(
    session: Session,
    State(albums): State<GuardedAlbumManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    albums.remove_like(&session.user_id, &id)?;
    Ok(success_message(StatusCode::OK, "Album unliked"))
}

async fn get_likes(
    State(albums): State<GuardedAlbumManager>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let likes = albums.get_total_likes(&id)?;
    record_cache_lookup("total_album_likes", likes.source);
    let response = success_data(StatusCode::OK, json!({ "likes": likes.value }));
    Ok(tag_source(response, likes.source))
}

// =========================================================================
// Covers
// =========================================================================

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::bad_request(err.body_text())
    }
}

async fn post_cover(
    State(albums): State<GuardedAlbumManager>,
    State(storage): State<GuardedFileStorage>,
    State(config): State<ServerConfig>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let limit = config.max_cover_bytes;
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let mut cover = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if field.name() != Some(COVER_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let is_image = field
            .content_type()
            .map(|content_type| content_type.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(ApiError::bad_request("\"cover\" must be an image"));
        }
        let bytes = field.bytes().await.map_err(|err| multipart_error(err, limit))?;
        cover = Some(bytes);
        break;
    }
    let cover = cover.ok_or_else(|| ApiError::bad_request("\"cover\" is required"))?;

    albums.ensure_album_exists(&id)?;
    let file_name = storage.store_image(COVERS_NAMESPACE, &cover)?;
    let cover_url = config.cover_url(&file_name);
    albums.set_album_cover(&id, &cover_url)?;
    info!("Album {} cover set to {}", id, cover_url);

    Ok(success_message(StatusCode::CREATED, "Cover uploaded"))
}

pub fn album_routes(max_cover_bytes: usize) -> Router<ServerState> {
    Router::new()
        .route("/albums", post(post_album))
        .route(
            "/albums/{id}",
            get(get_album).put(put_album).delete(delete_album),
        )
        .route(
            "/albums/{id}/likes",
            post(post_like).delete(delete_like).get(get_likes),
        )
        .route(
            "/albums/{id}/covers",
            post(post_cover).layer(DefaultBodyLimit::max(max_cover_bytes)),
        )
}
