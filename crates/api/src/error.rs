//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server faults to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; responses are JSON with a stable `message`, or an
//! `errors` field map for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::media::MediaError;
use crate::services::orders::OrderError;
use crate::validate::FieldErrors;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request validation failed; reported per field.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Media store operation failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl AppError {
    /// Status code for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::CustomerNotFound => StatusCode::NOT_FOUND,
                AuthError::NotVerified | AuthError::ResetNotAuthorized => StatusCode::FORBIDDEN,
                AuthError::InvalidOrExpiredOtp => StatusCode::BAD_REQUEST,
                AuthError::Delivery(_) => StatusCode::BAD_GATEWAY,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Order(err) => match err {
                OrderError::CustomerNotFound
                | OrderError::OrderNotFound
                | OrderError::LineNotFound
                | OrderError::ProductNotFound => StatusCode::NOT_FOUND,
                OrderError::InvalidQuantity => StatusCode::UNPROCESSABLE_ENTITY,
                OrderError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Media(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal detail stays out of responses.
    fn message(&self) -> String {
        match self {
            Self::Validation(_) => "The given data was invalid.".to_owned(),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "The email must be a valid email address.".to_owned(),
                AuthError::InvalidCredentials => {
                    // Deliberate: tells the caller the email exists. Inherited
                    // behavior, kept intentionally (see DESIGN.md).
                    "Invalid credentials. If this email is already registered, \
                     use the correct password or a different email."
                        .to_owned()
                }
                AuthError::EmailTaken => "Email already exists".to_owned(),
                AuthError::CustomerNotFound => "Customer not found".to_owned(),
                AuthError::NotVerified => "Account not verified. Verify the OTP first.".to_owned(),
                AuthError::InvalidOrExpiredOtp => "Invalid or expired OTP".to_owned(),
                AuthError::ResetNotAuthorized => "OTP not verified".to_owned(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::PasswordMismatch => "Password confirmation does not match".to_owned(),
                AuthError::Delivery(_) => {
                    "Could not deliver the OTP email. Use resend to try again.".to_owned()
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_owned()
                }
            },
            Self::Order(err) => match err {
                OrderError::CustomerNotFound => "Customer not found".to_owned(),
                OrderError::OrderNotFound => "Order not found".to_owned(),
                OrderError::LineNotFound => "Order item not found".to_owned(),
                OrderError::ProductNotFound => "Product not found".to_owned(),
                OrderError::InvalidQuantity => "Quantity must be a positive integer".to_owned(),
                OrderError::InsufficientStock { product } => {
                    format!("Not enough stock for product: {product}")
                }
                OrderError::Repository(_) => "Internal server error".to_owned(),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) | Self::Media(_) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
        }
    }

    /// True for faults worth an error tracker event.
    fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Media(_)
                | Self::Internal(_)
                | Self::Auth(
                    AuthError::Repository(_) | AuthError::PasswordHash | AuthError::Delivery(_)
                )
                | Self::Order(OrderError::Repository(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => json!({ "errors": errors }),
            other => json!({ "message": other.message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::EmailTaken)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidOrExpiredOtp)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::NotVerified)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::ResetNotAuthorized)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::CustomerNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_order_error_status_codes() {
        assert_eq!(
            get_status(AppError::Order(OrderError::InsufficientStock {
                product: "Mango".to_owned()
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::ProductNotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::InvalidQuantity)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_validation_status_code() {
        let mut errors = FieldErrors::new();
        errors.add("email", "The email field is required.");
        assert_eq!(
            get_status(AppError::Validation(errors)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_insufficient_stock_names_the_product() {
        let err = AppError::Order(OrderError::InsufficientStock {
            product: "Mango".to_owned(),
        });
        assert_eq!(err.message(), "Not enough stock for product: Mango");
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "row 17 has a broken email".to_owned(),
        ));
        assert_eq!(err.message(), "Internal server error");
    }
}
