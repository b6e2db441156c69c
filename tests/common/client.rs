//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint. When routes or request formats
//! change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client that carries a bearer access token once logged in
pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            access_token: None,
            refresh_token: None,
        }
    }

    /// Creates a client logged in as the given user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String, username: &str, password: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed",
            username
        );
        let body: Value = response.json().await.expect("Invalid login response");
        client.access_token = body["data"]["accessToken"].as_str().map(str::to_string);
        client.refresh_token = body["data"]["refreshToken"].as_str().map(str::to_string);

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Response {
        self.authorized(request)
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Users and authentication
    // ========================================================================

    /// POST /users
    pub async fn register(&self, username: &str, password: &str, fullname: &str) -> Response {
        self.send(self.client.post(self.url("/users")).json(&json!({
            "username": username,
            "password": password,
            "fullname": fullname,
        })))
        .await
    }

    /// GET /users/{id}
    pub async fn get_user(&self, user_id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/users/{}", user_id))))
            .await
    }

    /// POST /authentications
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.send(self.client.post(self.url("/authentications")).json(&json!({
            "username": username,
            "password": password,
        })))
        .await
    }

    /// PUT /authentications
    pub async fn refresh(&self, refresh_token: &str) -> Response {
        self.send(
            self.client
                .put(self.url("/authentications"))
                .json(&json!({ "refreshToken": refresh_token })),
        )
        .await
    }

    /// DELETE /authentications
    pub async fn logout(&self, refresh_token: &str) -> Response {
        self.send(
            self.client
                .delete(self.url("/authentications"))
                .json(&json!({ "refreshToken": refresh_token })),
        )
        .await
    }

    // ========================================================================
    // Albums
    // ========================================================================

    /// POST /albums
    pub async fn create_album(&self, name: &str, year: i32) -> Response {
        self.send(
            self.client
                .post(self.url("/albums"))
                .json(&json!({ "name": name, "year": year })),
        )
        .await
    }

    /// GET /albums/{id}
    pub async fn get_album(&self, album_id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/albums/{}", album_id))))
            .await
    }

    /// PUT /albums/{id}
    pub async fn update_album(&self, album_id: &str, name: &str, year: i32) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/albums/{}", album_id)))
                .json(&json!({ "name": name, "year": year })),
        )
        .await
    }

    /// DELETE /albums/{id}
    pub async fn delete_album(&self, album_id: &str) -> Response {
        self.send(self.client.delete(self.url(&format!("/albums/{}", album_id))))
            .await
    }

    /// POST /albums/{id}/likes
    pub async fn like_album(&self, album_id: &str) -> Response {
        self.send(
            self.client
                .post(self.url(&format!("/albums/{}/likes", album_id))),
        )
        .await
    }

    /// DELETE /albums/{id}/likes
    pub async fn unlike_album(&self, album_id: &str) -> Response {
        self.send(
            self.client
                .delete(self.url(&format!("/albums/{}/likes", album_id))),
        )
        .await
    }

    /// GET /albums/{id}/likes
    pub async fn get_album_likes(&self, album_id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/albums/{}/likes", album_id))))
            .await
    }

    /// POST /albums/{id}/covers
    pub async fn upload_cover(&self, album_id: &str, bytes: Vec<u8>, mime: &str) -> Response {
        let part = Part::bytes(bytes)
            .file_name("cover.png")
            .mime_str(mime)
            .expect("Invalid mime type");
        self.send(
            self.client
                .post(self.url(&format!("/albums/{}/covers", album_id)))
                .multipart(Form::new().part("cover", part)),
        )
        .await
    }

    // ========================================================================
    // Songs
    // ========================================================================

    /// POST /songs
    pub async fn create_song(&self, song: Value) -> Response {
        self.send(self.client.post(self.url("/songs")).json(&song))
            .await
    }

    /// GET /songs with optional title/performer filters
    pub async fn search_songs(&self, title: Option<&str>, performer: Option<&str>) -> Response {
        let mut query = Vec::new();
        if let Some(title) = title {
            query.push(("title", title));
        }
        if let Some(performer) = performer {
            query.push(("performer", performer));
        }
        self.send(self.client.get(self.url("/songs")).query(&query))
            .await
    }

    /// GET /songs/{id}
    pub async fn get_song(&self, song_id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/songs/{}", song_id))))
            .await
    }

    /// PUT /songs/{id}
    pub async fn update_song(&self, song_id: &str, song: Value) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/songs/{}", song_id)))
                .json(&song),
        )
        .await
    }

    /// DELETE /songs/{id}
    pub async fn delete_song(&self, song_id: &str) -> Response {
        self.send(self.client.delete(self.url(&format!("/songs/{}", song_id))))
            .await
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    /// POST /playlists
    pub async fn create_playlist(&self, name: &str) -> Response {
        self.send(
            self.client
                .post(self.url("/playlists"))
                .json(&json!({ "name": name })),
        )
        .await
    }

    /// POST /playlists, returning the new id
    pub async fn create_playlist_id(&self, name: &str) -> String {
        let response = self.create_playlist(name).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid playlist response");
        body["data"]["playlistId"]
            .as_str()
            .expect("Missing playlistId")
            .to_string()
    }

    /// GET /playlists
    pub async fn get_playlists(&self) -> Response {
        self.send(self.client.get(self.url("/playlists"))).await
    }

    /// DELETE /playlists/{id}
    pub async fn delete_playlist(&self, playlist_id: &str) -> Response {
        self.send(
            self.client
                .delete(self.url(&format!("/playlists/{}", playlist_id))),
        )
        .await
    }

    /// POST /playlists/{id}/songs
    pub async fn add_playlist_song(&self, playlist_id: &str, song_id: &str) -> Response {
        self.send(
            self.client
                .post(self.url(&format!("/playlists/{}/songs", playlist_id)))
                .json(&json!({ "songId": song_id })),
        )
        .await
    }

    /// GET /playlists/{id}/songs
    pub async fn get_playlist_songs(&self, playlist_id: &str) -> Response {
        self.send(
            self.client
                .get(self.url(&format!("/playlists/{}/songs", playlist_id))),
        )
        .await
    }

    /// DELETE /playlists/{id}/songs
    pub async fn remove_playlist_song(&self, playlist_id: &str, song_id: &str) -> Response {
        self.send(
            self.client
                .delete(self.url(&format!("/playlists/{}/songs", playlist_id)))
                .json(&json!({ "songId": song_id })),
        )
        .await
    }

    /// GET /playlists/{id}/activities
    pub async fn get_playlist_activities(&self, playlist_id: &str) -> Response {
        self.send(
            self.client
                .get(self.url(&format!("/playlists/{}/activities", playlist_id))),
        )
        .await
    }

    // ========================================================================
    // Collaborations and exports
    // ========================================================================

    /// POST /collaborations
    pub async fn add_collaborator(&self, playlist_id: &str, user_id: &str) -> Response {
        self.send(
            self.client
                .post(self.url("/collaborations"))
                .json(&json!({ "playlistId": playlist_id, "userId": user_id })),
        )
        .await
    }

    /// DELETE /collaborations
    pub async fn remove_collaborator(&self, playlist_id: &str, user_id: &str) -> Response {
        self.send(
            self.client
                .delete(self.url("/collaborations"))
                .json(&json!({ "playlistId": playlist_id, "userId": user_id })),
        )
        .await
    }

    /// POST /export/playlists/{id}
    pub async fn export_playlist(&self, playlist_id: &str, target_email: &str) -> Response {
        self.send(
            self.client
                .post(self.url(&format!("/export/playlists/{}", playlist_id)))
                .json(&json!({ "targetEmail": target_email })),
        )
        .await
    }
}
