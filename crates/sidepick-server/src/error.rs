//! HTTP error mapping.
//!
//! Failures leave the API as
//! `{ "statusCode": n, "message": s, "timestamp": iso8601, "path": url }`
//! with a status code chosen by the error's kind. Validation failures keep
//! their user-readable messages; storage failures are flattened to an
//! opaque internal error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use sidepick_service::ServiceError;

/// A failed request, ready to render.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: &str) -> Self {
        Self {
            status,
            message: message.into(),
            path: path.to_string(),
        }
    }

    /// Missing or rejected bearer token.
    pub fn unauthenticated(path: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required", path)
    }

    /// Maps a room-service failure onto its HTTP rendering.
    pub fn from_service(err: ServiceError, path: &str) -> Self {
        let status = status_for(&err);
        let message = match &err {
            ServiceError::Store(inner) => {
                tracing::error!(%path, error = %inner, "storage failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        Self::new(status, message, path)
    }
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound | ServiceError::MemberNotFound => StatusCode::NOT_FOUND,
        ServiceError::NotOwner => StatusCode::FORBIDDEN,
        ServiceError::RoomNotJoinable
        | ServiceError::RoomFull
        | ServiceError::HasActiveRoom
        | ServiceError::WrongStatus
        | ServiceError::TooFewMembers
        | ServiceError::InvalidLabel(_)
        | ServiceError::InvalidRule(_)
        | ServiceError::ConflictingRules
        | ServiceError::CannotRemoveOwner
        | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::CodeExhausted | ServiceError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
        let body = serde_json::json!({
            "statusCode": self.status.as_u16(),
            "message": self.message,
            "timestamp": timestamp,
            "path": self.path,
        });
        (self.status, Json(body)).into_response()
    }
}
