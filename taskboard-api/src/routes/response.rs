/// Success envelope shared by every resource route
///
/// ```json
/// { "success": true, "message": "Task created successfully", "data": { ... } }
/// ```
///
/// `data` is omitted for deletes.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true`; errors use [`crate::error::ErrorResponse`]
    pub success: bool,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A successful response with no payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// `200 OK` with data
pub fn ok<T>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(message, data))
}

/// `201 Created` with the new entity
pub fn created<T>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::ok(message, data)))
}

/// `200 OK` with only a message
pub fn done(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(message))
}
