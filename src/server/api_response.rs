//! The `{status, message}` / `{status, data}` envelope shared by every endpoint.

use super::metrics::record_error;
use crate::error::ServiceError;
use crate::storage::StorageError;
use axum::{
    extract::{FromRequest, Json, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

const INTERNAL_ERROR_MESSAGE: &str = "Sorry, the server failed to process your request";

#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    PayloadTooLarge(usize),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedMediaType => {
                ApiError::Service(ServiceError::validation(err.to_string()))
            }
            StorageError::Io(io) => ApiError::Service(ServiceError::Internal(io.into())),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Service(ServiceError::validation(message))
    }
}

fn fail(status: StatusCode, message: String) -> Response {
    debug!("Responding {} with: {}", status, message);
    (status, Json(json!({ "status": "fail", "message": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let service_error = match self {
            ApiError::PayloadTooLarge(limit) => {
                return fail(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Payload content length greater than maximum allowed: {}", limit),
                )
            }
            ApiError::Service(err) => err,
        };

        match service_error {
            ServiceError::Validation(message) | ServiceError::Conflict(message) => {
                fail(StatusCode::BAD_REQUEST, message)
            }
            ServiceError::Authentication(message) => fail(StatusCode::UNAUTHORIZED, message),
            ServiceError::Authorization(message) => fail(StatusCode::FORBIDDEN, message),
            ServiceError::NotFound(message) => fail(StatusCode::NOT_FOUND, message),
            ServiceError::Internal(err) => {
                error!("Internal error: {:#}", err);
                record_error("internal");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "status": "error", "message": INTERNAL_ERROR_MESSAGE })),
                )
                    .into_response()
            }
        }
    }
}

/// `{status: "success", data}` with the given status code.
pub fn success_data(status: StatusCode, data: Value) -> Response {
    (status, Json(json!({ "status": "success", "data": data }))).into_response()
}

/// `{status: "success", message}` with the given status code.
pub fn success_message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "success", "message": message }))).into_response()
}

/// JSON body extractor whose rejections are 400s in the fail envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}
