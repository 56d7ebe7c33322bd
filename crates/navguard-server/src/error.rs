//! Error types for the HTTP front end.

use hyper::StatusCode;
use thiserror::Error;

/// A request rejected before (or instead of) reaching the sanitizer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RequestError {
    /// The body is not valid JSON.
    #[error("Invalid JSON")]
    InvalidJson,

    /// The `code` field is missing or not a string.
    #[error("`code` must be a string")]
    CodeNotString,

    /// The body exceeds the configured size limit.
    #[error("request body exceeds {max} bytes")]
    BodyTooLarge {
        /// Maximum accepted body size.
        max: usize,
    },

    /// Reading the body from the connection failed.
    #[error("failed to read request body: {0}")]
    Body(#[from] hyper::Error),

    /// The sanitizer task did not complete.
    #[error("sanitizer task failed")]
    Internal,
}

impl RequestError {
    /// HTTP status returned for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::CodeNotString | Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a static error code string for programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::CodeNotString => "CODE_NOT_STRING",
            Self::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            Self::Body(_) => "BODY_READ_FAILED",
            Self::Internal => "INTERNAL",
        }
    }

    /// JSON body sent to the client: `{"error": "<message>"}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// Failures starting or running the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the socket or serving connections failed.
    #[error("http server error: {0}")]
    Hyper(#[from] hyper::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_format() {
        assert_eq!(
            RequestError::InvalidJson.to_json(),
            serde_json::json!({"error": "Invalid JSON"})
        );
        assert_eq!(
            RequestError::CodeNotString.to_json(),
            serde_json::json!({"error": "`code` must be a string"})
        );
    }

    #[test]
    fn statuses() {
        assert_eq!(RequestError::InvalidJson.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RequestError::CodeNotString.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RequestError::BodyTooLarge { max: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(RequestError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(RequestError::BodyTooLarge { max: 1 }.code(), "BODY_TOO_LARGE");
        assert_eq!(RequestError::CodeNotString.code(), "CODE_NOT_STRING");
    }
}
