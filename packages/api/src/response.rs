// ABOUTME: Shared API response types and error handling
// ABOUTME: Provides consistent response format across all API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Serialize;

use sowkit_proposals::ManagerError;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Convert manager errors to HTTP responses on the owner surface, where
/// specific error codes are acceptable.
///
/// `ManagerError` lives in the `sowkit-proposals` crate and `IntoResponse`
/// in `axum`, so the orphan rule forbids implementing the foreign trait for
/// the foreign type here. This crate-local trait provides the same
/// `into_response` method used at the handler call sites.
pub(crate) trait ManagerErrorResponse {
    fn into_response(self) -> axum::response::Response;
}

impl ManagerErrorResponse for ManagerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ManagerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ManagerError::Validation(_) | ManagerError::InvalidPrefix(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ManagerError::InvalidTransition(_)
            | ManagerError::AlreadySigned
            | ManagerError::EditNotAllowed(_)
            | ManagerError::SignatureNotAllowed => (StatusCode::CONFLICT, self.to_string()),
            ManagerError::Storage(_) | ManagerError::Integrity(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
    }
}

/// The recipient surface never distinguishes internal from validation
/// failures beyond the status code; messages stay generic.
pub fn public_error(error: ManagerError) -> axum::response::Response {
    let (status, message) = match &error {
        ManagerError::NotFound(_) => (StatusCode::NOT_FOUND, "Proposal not found"),
        ManagerError::AlreadySigned => (StatusCode::CONFLICT, "Unable to process request"),
        ManagerError::Storage(_) | ManagerError::Integrity(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Unable to process request")
        }
        _ => (StatusCode::BAD_REQUEST, "Unable to process request"),
    };
    (
        status,
        ResponseJson(ApiResponse::<()>::error(message.to_string())),
    )
        .into_response()
}
