//! JSON error bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use agora_shared::AppError;

/// Message sent in place of server-side detail.
const GENERIC_MESSAGE: &str = "An error occurred";

/// Render an error as `{"error": <code>, "message": <message>}`.
///
/// Server errors never expose their detail; callers log it.
#[must_use]
pub fn error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if err.is_client_error() {
        err.message()
    } else {
        GENERIC_MESSAGE
    };

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": message
        })),
    )
        .into_response()
}
