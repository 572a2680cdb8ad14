use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error body returned to clients.
///
/// `error` carries the human-readable message, `details` the upstream
/// error string when one is available (database driver, payment API).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(_) | Self::DataInconsistency(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the caller. Internal failures keep a generic
    /// headline; the raw cause goes into `details` instead.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::PaymentProvider(_) => "Payment provider error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Upstream detail string, when one exists.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::DatabaseError(err) => Some(err.to_string()),
            Self::PaymentProvider(msg) => Some(msg.clone()),
            Self::Internal(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.response_message(),
            details: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = ServiceError::ValidationError("cart must contain at least one item".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.detail().is_none());
    }

    #[test]
    fn provider_errors_are_server_class_with_detail() {
        let err = ServiceError::PaymentProvider("connect timeout".into());
        assert!(err.status_code().is_server_error());
        assert_eq!(err.detail().as_deref(), Some("connect timeout"));
    }

    #[test]
    fn database_errors_hide_the_cause_in_the_headline() {
        let err = ServiceError::DatabaseError(sea_orm::DbErr::Custom("boom".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response_message(), "Database error");
        assert!(err.detail().unwrap().contains("boom"));
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        let err = ServiceError::NotFound("Order not found".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
