//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use gadgethub_app::api::ApiResponse;
use gadgethub_domain::error::{HubError, ValidationError};

/// A failure the transport answers itself, with an error envelope body.
#[derive(Debug)]
pub enum ApiError {
    /// No API route has this path.
    UnknownPath(String),
    /// The core rejected the call outside of the API handler.
    Hub(HubError),
    /// The handler accepted the request but never answered.
    NoReply,
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self::Hub(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Hub(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::UnknownPath(path) => (
                StatusCode::NOT_FOUND,
                ApiResponse::error("NotFoundError", format!("No route for path '{path}'")),
            ),
            Self::Hub(err) => {
                let status = match err {
                    HubError::NotFound(_) => StatusCode::NOT_FOUND,
                    HubError::NoResponse(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, ApiResponse::from_error(err))
            }
            Self::NoReply => {
                tracing::error!("api handler accepted a request without answering");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::error("InternalError", "internal server error"),
                )
            }
        };

        (status, Json(body.into_value())).into_response()
    }
}
