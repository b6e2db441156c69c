use super::api_response::ApiError;
use super::state::ServerState;
use crate::error::ServiceError;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

/// The verified caller of an authenticated endpoint.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, ctx)
                .await
                .map_err(|rejection| {
                    debug!("No usable bearer token: {}", rejection);
                    ApiError::from(ServiceError::authentication("Missing authentication"))
                })?;

        let user_id = ctx.user_manager.authenticate(bearer.token())?;
        Ok(Session { user_id })
    }
}
