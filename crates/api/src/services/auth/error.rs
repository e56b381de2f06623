//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::MailerError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] sugarloaf_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email is already registered (creation race or pre-check).
    #[error("email already registered")]
    EmailTaken,

    /// Customer not found.
    #[error("customer not found")]
    CustomerNotFound,

    /// Customer has not completed OTP verification.
    #[error("account not verified")]
    NotVerified,

    /// OTP is absent, expired, or doesn't match.
    #[error("invalid or expired OTP")]
    InvalidOrExpiredOtp,

    /// Password reset attempted without a valid prior OTP verification.
    #[error("password reset not authorized")]
    ResetNotAuthorized,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password confirmation doesn't match.
    #[error("password confirmation does not match")]
    PasswordMismatch,

    /// The OTP email could not be delivered. Partial success: the customer
    /// record and the pending challenge already exist - resend, don't retry
    /// the whole operation.
    #[error("could not deliver OTP email: {0}")]
    Delivery(#[source] MailerError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
