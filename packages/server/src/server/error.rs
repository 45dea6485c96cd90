//! JSON error responses.
//!
//! Every failure leaves the server as
//! `{"error": {"code": "...", "message": "...", "details": {...}}}`.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::domains::queue::models::OrderingError;
use crate::domains::queue::QueueError;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl QueueError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueueError::Validation { .. }
            | QueueError::DuplicateItem(_)
            | QueueError::InvalidOrdering(_) => StatusCode::BAD_REQUEST,
            QueueError::NotFound(_) => StatusCode::NOT_FOUND,
            QueueError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            QueueError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<JsonValue> {
        match self {
            QueueError::DuplicateItem(item_ref) => Some(json!({ "item_ref": item_ref })),
            QueueError::NotFound(id) => Some(json!({ "id": id })),
            QueueError::InvalidOrdering(OrderingError::Occupied { position, occupant }) => {
                Some(json!({ "position": position, "occupant": occupant }))
            }
            QueueError::RateLimitExceeded { max_calls, window } => Some(json!({
                "max_calls": max_calls,
                "window_seconds": window.as_secs(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            QueueError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed with internal error");
                INTERNAL_MESSAGE.to_string()
            }
            QueueError::RateLimitExceeded { .. } => {
                tracing::info!(code = self.code(), "{}", self);
                self.to_string()
            }
            _ => {
                tracing::debug!(code = self.code(), error = %self, "Request rejected");
                self.to_string()
            }
        };

        let retry_after = match &self {
            QueueError::RateLimitExceeded { window, .. } => {
                HeaderValue::from_str(&window.as_secs().max(1).to_string()).ok()
            }
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
                details: self.details(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::common::EntryId;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            QueueError::validation("MISSING_ITEM_REF", "x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QueueError::NotFound(EntryId::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            QueueError::from(OrderingError::NotFinite).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QueueError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limit_response_sets_retry_after() {
        let response = QueueError::RateLimitExceeded {
            max_calls: 5,
            window: Duration::from_secs(10),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "10");
    }
}
