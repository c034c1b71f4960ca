use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

/// `classPath` rendered when the origin of a failure is not known
pub const UNKNOWN_CLASS_PATH: &str = "Unknown";

/// Normalized error payload returned to clients
///
/// Serialized as:
/// ```text
/// {
///   "status": 404,
///   "error": "Not Found",
///   "message": "user 7 not found",
///   "classPath": "app::users::UserService.find:42",
///   "originalMessage": null,
///   "timestamp": "2026-10-18T12:00:00.123456"
/// }
/// ```
///
/// `message` and `originalMessage` are always present and `null` when absent.
/// The timestamp is the local time at construction; the record is never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    status: u16,
    error: String,
    message: Option<String>,
    class_path: String,
    original_message: Option<String>,
    timestamp: NaiveDateTime,
}

impl ErrorResponse {
    /// Create a response stamped with the current local time
    ///
    /// An empty `class_path` is replaced by [`UNKNOWN_CLASS_PATH`].
    pub fn new(
        status: StatusCode,
        error: impl Into<String>,
        message: Option<String>,
        class_path: impl Into<String>,
        original_message: Option<String>,
    ) -> Self {
        let class_path = class_path.into();
        Self {
            status: status.as_u16(),
            error: error.into(),
            message,
            class_path: if class_path.is_empty() {
                UNKNOWN_CLASS_PATH.to_string()
            } else {
                class_path
            },
            original_message,
            timestamp: Local::now().naive_local(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The status as an HTTP status code
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn class_path(&self) -> &str {
        &self.class_path
    }

    pub fn original_message(&self) -> Option<&str> {
        self.original_message.as_deref()
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Copy with the internal details hidden, timestamp kept
    pub(crate) fn redacted(mut self, hide_class_path: bool, hide_original_message: bool) -> Self {
        if hide_class_path {
            self.class_path = UNKNOWN_CLASS_PATH.to_string();
        }
        if hide_original_message {
            self.original_message = None;
        }
        self
    }

    /// Field-by-field equality ignoring the timestamp
    pub fn same_payload(&self, other: &Self) -> bool {
        self.status == other.status
            && self.error == other.error
            && self.message == other.message
            && self.class_path == other.class_path
            && self.original_message == other.original_message
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_serializes_camel_case_with_nulls() {
        let response = ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            None,
            "app::users.create:12",
            None,
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["error"], "Bad Request");
        assert_eq!(json["message"], Value::Null);
        assert_eq!(json["classPath"], "app::users.create:12");
        assert_eq!(json["originalMessage"], Value::Null);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_empty_class_path_becomes_unknown() {
        let response = ErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            Some("boom".to_string()),
            "",
            None,
        );
        assert_eq!(response.class_path(), UNKNOWN_CLASS_PATH);
    }

    #[test]
    fn test_same_payload_ignores_timestamp() {
        let first = ErrorResponse::new(StatusCode::NOT_FOUND, "Not Found", None, "a.b:1", None);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ErrorResponse::new(StatusCode::NOT_FOUND, "Not Found", None, "a.b:1", None);

        assert!(first.same_payload(&second));
        assert_ne!(first.timestamp(), second.timestamp());
    }

    #[tokio::test]
    async fn test_into_response_uses_status() {
        let response = ErrorResponse::new(StatusCode::CONFLICT, "Conflict", None, "a.b:1", None)
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
