//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Responses carry a JSON body
//! `{"error": "..."}`; server errors are captured to Sentry and their details
//! are never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use shoply_core::SlugError;
use shoply_core::cart::CartError;
use shoply_core::order_flow::OrderFlowError;

use crate::db::RepositoryError;
use crate::db::orders::OrderWriteError;
use crate::services::invoices::InvoiceError;
use crate::services::uploads::UploadError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Admin session missing.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with the current state (e.g. deleting a category
    /// that still has children).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload exceeds the size limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) | RepositoryError::Ordering(_) => {
                    StatusCode::BAD_REQUEST
                }
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(RepositoryError::Ordering(err)) => err.to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::PayloadTooLarge(msg) => msg.clone(),
            Self::RateLimited => "Too many requests".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<OrderWriteError> for AppError {
    fn from(err: OrderWriteError) -> Self {
        match err {
            OrderWriteError::Repository(e) => Self::Database(e),
            OrderWriteError::Flow(e) => e.into(),
            other @ (OrderWriteError::Unavailable(_)
            | OrderWriteError::UnknownVariant { .. }
            | OrderWriteError::InsufficientStock { .. }) => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<OrderFlowError> for AppError {
    fn from(err: OrderFlowError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound => Self::NotFound(err.to_string()),
            CartError::ZeroQuantity | CartError::QuantityTooLarge { .. } => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<SlugError> for AppError {
    fn from(err: SlugError) -> Self {
        Self::BadRequest(format!("slug: {err}"))
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            UploadError::Io(e) => Self::Internal(format!("upload write failed: {e}")),
            UploadError::MissingFile
            | UploadError::UnsupportedType(_)
            | UploadError::ContentMismatch
            | UploadError::UnsafeSvg => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::Repository(e) => Self::Database(e),
            InvoiceError::OrderNotFound => Self::NotFound("order not found".to_string()),
            InvoiceError::Pdf(e) => Self::Internal(e.to_string()),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for admin and checkout actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use shoply_core::catalog::OrderingError;
    use shoply_core::{OrderStatus, ProductId};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::PayloadTooLarge("test".to_string())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_client_codes() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("duplicate slug".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::Ordering(OrderingError::CreatesCycle).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_order_errors_map_to_bad_request() {
        let stock = OrderWriteError::InsufficientStock {
            name: "Mug".to_string(),
            available: 1,
        };
        assert_eq!(get_status(stock.into()), StatusCode::BAD_REQUEST);

        let flow = OrderWriteError::Flow(OrderFlowError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        });
        assert_eq!(get_status(flow.into()), StatusCode::BAD_REQUEST);

        let missing = OrderWriteError::Unavailable(ProductId::new(3));
        assert_eq!(get_status(missing.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_errors() {
        assert_eq!(
            get_status(UploadError::TooLarge { max: 10 }.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(UploadError::ContentMismatch.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("connection refused at 10.0.0.3".to_string()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_carry_message() {
        let response = AppError::BadRequest("name is required".to_string()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "name is required");
    }
}
