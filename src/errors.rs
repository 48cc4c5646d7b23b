use crate::CONFIG;
use async_graphql::ErrorExtensions;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Io(#[from] tokio::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected Error: {0}")]
    Custom(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{status} {status_text}: LunarCrush API error: {status} {status_text}")]
    Upstream { status: u16, status_text: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    RedisError(#[from] redis::RedisError),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    RateLimited { message: String, limit: u64 },

    #[error("Request timed out")]
    Timeout,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Json(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::Jwt(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Http(err) if err.is_timeout() => StatusCode::REQUEST_TIMEOUT,
            ApiError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable code used in the error envelope
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::Json(_) => "validation_error",
            ApiError::Unauthorized(_) | ApiError::Jwt(_) => "authentication_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::Timeout => "timeout_error",
            ApiError::Http(err) if err.is_timeout() => "timeout_error",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::RateLimited { .. } => "rate_limit_exceeded",
            ApiError::Upstream { .. } | ApiError::Http(_) => "upstream_error",
            _ => "internal_server_error",
        }
    }

    /// Code reported in GraphQL error extensions
    pub fn graphql_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::Json(_) => "BAD_USER_INPUT",
            ApiError::Unauthorized(_) | ApiError::Jwt(_) => "UNAUTHENTICATED",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Upstream { .. } | ApiError::Http(_) => "UPSTREAM_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            _ => "INTERNAL",
        }
    }

    /// Message safe to show to clients. Internal failures are masked
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => ErrorMessages::Unexpected.to_string(),
            _ => self.to_string(),
        }
    }

    pub fn into_envelope(self, request_id: Option<String>) -> ErrorEnvelope {
        let status = self.status_code();
        let debug = if status == StatusCode::INTERNAL_SERVER_ERROR && CONFIG.is_development() {
            Some(serde_json::json!({ "message": self.to_string() }))
        } else {
            None
        };
        let details = match &self {
            ApiError::RateLimited { limit, .. } => Some(serde_json::json!({ "limit": limit })),
            _ => None,
        };

        ErrorEnvelope {
            error: self.error_code().to_string(),
            message: self.public_message(),
            status: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
            details,
            debug,
        }
    }
}

/// Error messages for the API Responses
pub enum ErrorMessages {
    Unexpected,
    MissingApiKey,
    AuthRequired,
}

impl fmt::Display for ErrorMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessages::Unexpected => "An unexpected error occurred",
            ErrorMessages::MissingApiKey => {
                "API key is required. Provide it in Authorization header, X-API-Key header, \
                 or api_key query parameter."
            }
            ErrorMessages::AuthRequired => "Authentication required",
        };
        write!(f, "{message}")
    }
}

/// JSON body returned for every failed REST request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let status = self.status_code();
        (status, Json(self.into_envelope(None))).into_response()
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.graphql_code();
        async_graphql::Error::new(self.public_message()).extend_with(|_, e| e.set("code", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_format() {
        let err = ApiError::Upstream {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "404 Not Found: LunarCrush API error: 404 Not Found"
        );
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.graphql_code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("no".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::RateLimited {
                message: "slow down".into(),
                limit: 10
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError::Timeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            ApiError::Custom("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let envelope = ApiError::Custom("db password leaked".into()).into_envelope(None);
        assert_eq!(envelope.error, "internal_server_error");
        assert_eq!(envelope.message, "An unexpected error occurred");
        assert_eq!(envelope.status, 500);

        let envelope = ApiError::Validation("Input too long".into())
            .into_envelope(Some("req-1".to_string()));
        assert_eq!(envelope.message, "Input too long");
        assert_eq!(envelope.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_graphql_error_carries_code() {
        let gql = ApiError::Unauthorized("Authentication required".into()).extend();
        assert_eq!(gql.message, "Authentication required");
        let code = gql
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(async_graphql::Value::from("UNAUTHENTICATED")));
    }
}
