//! API error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use declutter_core::DeclutterError;
use serde::Serialize;
use tracing::{error, warn};

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
}

#[derive(Debug)]
pub enum ApiError {
    /// The request itself is unusable
    BadRequest(String),
    Declutter(DeclutterError),
    /// The extraction task panicked or was cancelled
    Internal(String),
}

impl From<DeclutterError> for ApiError {
    fn from(error: DeclutterError) -> Self {
        Self::Declutter(error)
    }
}

/// Status code for a pipeline error
pub fn status_for(error: &DeclutterError) -> StatusCode {
    match error {
        DeclutterError::InvalidUrl(_) | DeclutterError::ContentTooSmall { .. } | DeclutterError::NotMarkup => {
            StatusCode::BAD_REQUEST
        }
        DeclutterError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DeclutterError::NoReadableContent => StatusCode::UNPROCESSABLE_ENTITY,
        DeclutterError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_fetch_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody { error: message, suggestion: None }),
            Self::Declutter(e) => {
                let status = status_for(&e);
                (status, ErrorBody { error: e.to_string(), suggestion: e.suggestion() })
            }
            Self::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody { error: message, suggestion: None })
            }
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = body.error.as_str(), "request failed");
        } else {
            warn!(status = status.as_u16(), error = body.error.as_str(), "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&DeclutterError::NotMarkup), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&DeclutterError::ContentTooLarge { length: 11, limit: 10 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(status_for(&DeclutterError::NoReadableContent), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&DeclutterError::Timeout { timeout: 30 }), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(&DeclutterError::RedirectLoop { url: "https://a.com".into() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DeclutterError::UnreachableHost { url: "https://a.com".into() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DeclutterError::StructuredExtraction("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
