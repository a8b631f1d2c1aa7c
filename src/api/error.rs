//! HTTP error mapping.
//!
//! This is the only place where storage and domain errors become status
//! codes. Every error body is `{"error": <message>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::EcommerceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] EcommerceError),

    /// Malformed input; storage was not touched.
    #[error("{0}")]
    BadRequest(String),

    /// Empty result the caller asked to treat as missing.
    #[error("{0}")]
    NotFound(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("request timed out")]
    Timeout,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Domain(err) => match err {
                EcommerceError::StoreNotFound | EcommerceError::ProductNotFound | EcommerceError::CartLineNotFound => {
                    StatusCode::NOT_FOUND
                }
                EcommerceError::EmptyCart | EcommerceError::Validation(_) => StatusCode::BAD_REQUEST,
                EcommerceError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
                EcommerceError::Connection(_)
                | EcommerceError::Database(_)
                | EcommerceError::Transaction(_)
                | EcommerceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Domain(err) if err.is_storage_failure() => {
                tracing::error!(error = %err, "Storage failure");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ConnectionError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::from(EcommerceError::CartLineNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(EcommerceError::StoreNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(EcommerceError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(EcommerceError::PaymentDeclined("nope".into())).status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(AppError::from(EcommerceError::Transaction("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::from(EcommerceError::Connection(ConnectionError::NotInitialized)).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::BadRequest("Invalid store ID".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(AppError::UnsupportedMediaType("text/plain".into()).status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(AppError::from(EcommerceError::Validation("too many".into())).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let response = AppError::from(EcommerceError::Storage("password authentication failed".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_not_found_message_is_kept() {
        let response = AppError::from(EcommerceError::CartLineNotFound).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "product not found in cart");
    }
}
