//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::queue::QueueError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Invalid queue state: {0}")]
    InvalidQueueState(String),
    #[error("Allocation unavailable: {0}")]
    AllocationUnavailable(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(detail) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::InvalidTransition(detail) => (
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
                detail.clone(),
            ),
            ApiError::ConcurrentModification(detail) => (
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
                detail.clone(),
            ),
            ApiError::InvalidQueueState(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_QUEUE_STATE",
                detail.clone(),
            ),
            ApiError::AllocationUnavailable(detail) => {
                tracing::error!(detail, "ticket allocation unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ALLOCATION_UNAVAILABLE",
                    "Ticket allocation unavailable, retry shortly".to_string(),
                )
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    /// Short status tag for audit records ("ok" counterpart).
    pub fn audit_status(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidTransition(_) => "invalid_transition",
            ApiError::ConcurrentModification(_) => "concurrent_modification",
            ApiError::InvalidQueueState(_) => "invalid_queue_state",
            ApiError::AllocationUnavailable(_) => "allocation_unavailable",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match &err {
            QueueError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            QueueError::InvalidTransition { .. } => ApiError::InvalidTransition(err.to_string()),
            QueueError::ConcurrentModification { .. } => {
                ApiError::ConcurrentModification(err.to_string())
            }
            QueueError::InvalidQueueState { .. } => ApiError::InvalidQueueState(err.to_string()),
            QueueError::AllocationUnavailable(_) => {
                ApiError::AllocationUnavailable(err.to_string())
            }
            QueueError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match &err {
            DatabaseError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DatabaseError::ConstraintViolation(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use uuid::Uuid;

    use crate::models::EntryStatus;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("QueueEntry not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_transition_returns_409() {
        let err: ApiError = QueueError::InvalidTransition {
            from: EntryStatus::Completed,
            requested: EntryStatus::InProgress,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INVALID_TRANSITION");
        let message = json["error"]["message"].as_str().unwrap();
        assert!(message.contains("completed"));
        assert!(message.contains("in_progress"));
    }

    #[tokio::test]
    async fn concurrent_modification_returns_409() {
        let err: ApiError = QueueError::ConcurrentModification {
            id: Uuid::new_v4().to_string(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "CONCURRENT_MODIFICATION");
    }

    #[tokio::test]
    async fn invalid_queue_state_returns_400() {
        let err: ApiError = QueueError::InvalidQueueState {
            ids: vec!["abc".into()],
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INVALID_QUEUE_STATE");
    }

    #[tokio::test]
    async fn allocation_unavailable_returns_503() {
        let err: ApiError = QueueError::AllocationUnavailable("disk gone".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "ALLOCATION_UNAVAILABLE");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("something broke".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let response = ApiError::Forbidden("admin only".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "FORBIDDEN");
    }
}
