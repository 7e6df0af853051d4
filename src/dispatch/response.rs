//! Standard JSON responses produced by the dispatch boundary.
//!
//! # Design Decisions
//! - Every error answer is a JSON object with an `error` field
//! - Internal details never reach the client body; only an optional message

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::validation::schema::ValidationFailure;

/// Message used for 500 responses when error messages are not exposed.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

pub fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// `404 {"error": "Not Found"}`
pub fn not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Not Found" }))
}

/// `400 {"error": "Validation Failed", "details": {...}, "formErrors": [...]}`
pub fn validation_failed(failure: &ValidationFailure) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        json!({
            "error": "Validation Failed",
            "details": failure.field_errors,
            "formErrors": failure.form_errors,
        }),
    )
}

/// `500 {"error": "Internal Server Error", "message": ...}`
pub fn internal_error(message: &str) -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "Internal Server Error", "message": message }),
    )
}
