//! HTTP-facing error handling for introspect_web
//!
//! Errors that reach an HTTP route implement [`IntoErrorResponse`], which
//! picks the status code, renders an [`ErrorResponse`] body, and logs at a
//! level matching the severity. Errors raised on a WebSocket after the upgrade
//! never come through here; they are logged where they happen.
use crate::room::RoomError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Standard error response format for all HTTP endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "missing_game_info")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (structured data)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    /// Convert to HTTP response with specified status code
    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Client errors (4xx) - expected, normal operation
    Client,
    /// Server errors (5xx) - unexpected, needs investigation
    Server,
    /// Shared state is unusable
    Critical,
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error code
    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    /// Convert to HTTP response with logging
    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let severity = self.severity();
        let error_response = self.to_error_response();

        match severity {
            ErrorSeverity::Client => {
                tracing::info!(error = %error_response.error, status = status.as_u16(), "{}", error_response.message);
            }
            ErrorSeverity::Server => {
                tracing::error!(error = %error_response.error, status = status.as_u16(), "{}", error_response.message);
            }
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %error_response.error,
                    status = status.as_u16(),
                    critical = true,
                    "{}",
                    error_response.message
                );
            }
        }

        error_response.into_response(status)
    }
}

/// Problems with the request itself, found before any room is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("room name or player name is missing from the URL")]
    MissingGameInfo,
}

impl IntoErrorResponse for RequestError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_code(&self) -> &'static str {
        match self {
            RequestError::MissingGameInfo => "missing_game_info",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "required": ["player", "room"] }))
    }
}

impl IntoErrorResponse for RoomError {
    fn status_code(&self) -> StatusCode {
        match self {
            RoomError::NameTaken(_) => StatusCode::CONFLICT,
            RoomError::Game(_) | RoomError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RoomError::NameTaken(_) => "name_taken",
            RoomError::Game(_) => "game_error",
            RoomError::StoragePoisoned => "storage_poisoned",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            RoomError::NameTaken(_) => ErrorSeverity::Client,
            RoomError::Game(_) => ErrorSeverity::Server,
            RoomError::StoragePoisoned => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_response_serialization() {
        let error = ErrorResponse::new("test_error", "Test error message");
        let json = serde_json::to_value(&error).expect("serialize");

        assert_eq!(json["error"], "test_error");
        assert_eq!(json["message"], "Test error message");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn error_response_display() {
        let error = ErrorResponse::new("not_found", "Resource not found");
        assert_eq!(format!("{}", error), "not_found: Resource not found");
    }

    #[test]
    fn missing_game_info_is_a_bad_request() {
        let err = RequestError::MissingGameInfo;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.severity(), ErrorSeverity::Client);

        let body = err.to_error_response();
        assert_eq!(body.error, "missing_game_info");
        assert_eq!(body.details, Some(json!({ "required": ["player", "room"] })));
    }

    #[test]
    fn room_errors_map_to_status_and_severity() {
        let taken = RoomError::NameTaken("ada".into());
        assert_eq!(taken.status_code(), StatusCode::CONFLICT);
        assert_eq!(taken.error_code(), "name_taken");

        let poisoned = RoomError::StoragePoisoned;
        assert_eq!(poisoned.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(poisoned.severity(), ErrorSeverity::Critical);

        let response = poisoned.into_http_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
