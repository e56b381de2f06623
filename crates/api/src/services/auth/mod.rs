//! Authentication service.
//!
//! The OTP-gated signup/login/reset state machine. Signup path:
//! `Unregistered -> PendingVerification (OTP issued) -> Verified`, where
//! `PendingVerification` may re-enter itself via resend. The password-reset
//! path runs on disjoint OTP keys and a single-use reset grant, so it can
//! never flip the durable verification flag as a side effect.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use sugarloaf_core::{CustomerId, Email};

use crate::db::RepositoryError;
use crate::db::customers::{CustomerRepository, ProfileUpdate};
use crate::models::Customer;
use crate::services::email::Mailer;
use crate::services::otp::{
    OTP_TTL, OtpChallenge, OtpKey, OtpPurpose, OtpStore, RESET_GRANT_TTL, ResetGrant,
    ResetGrantStore, generate_otp_code,
};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Outcome of an auth or resend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A challenge was issued and mailed; verification should follow.
    OtpSent,
    /// The account is already verified; no challenge was issued.
    AlreadyVerified,
}

/// Authentication service.
///
/// Reconciles "new customer, returning customer, or stuck mid-verification"
/// into one deterministic outcome per request.
pub struct AuthService<'a> {
    customers: CustomerRepository<'a>,
    otp: &'a OtpStore,
    reset_grants: &'a ResetGrantStore,
    mailer: &'a Mailer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        otp: &'a OtpStore,
        reset_grants: &'a ResetGrantStore,
        mailer: &'a Mailer,
    ) -> Self {
        Self {
            customers: CustomerRepository::new(pool),
            otp,
            reset_grants,
            mailer,
        }
    }

    // =========================================================================
    // Signup / login
    // =========================================================================

    /// Signup-or-login-and-challenge.
    ///
    /// A novel email creates an unverified customer; a returning unverified
    /// customer with the right password resumes the interrupted signup.
    /// Both converge on OTP issuance. An already-verified customer with the
    /// right password short-circuits without side effects.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email exists with a
    /// different password, `AuthError::EmailTaken` if a concurrent signup won
    /// the creation race, and `AuthError::Delivery` if the challenge was
    /// stored but the email could not be sent (resend is the recovery path).
    pub async fn auth(&self, email: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let customer = match self.customers.get_password_hash(&email).await? {
            Some((customer, stored_hash)) => {
                verify_password(password, &stored_hash)?;
                if customer.email_verified {
                    return Ok(AuthOutcome::AlreadyVerified);
                }
                customer
            }
            None => {
                let password_hash = hash_password(password)?;
                self.customers
                    .create(&email, &password_hash)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::Conflict(_) => AuthError::EmailTaken,
                        other => AuthError::Repository(other),
                    })?
            }
        };

        self.issue_otp(OtpPurpose::Signup, &email, customer.id)
            .await?;
        Ok(AuthOutcome::OtpSent)
    }

    /// Consume a signup OTP and mark the customer verified.
    ///
    /// The only place the durable verification flag transitions true on the
    /// signup path. The challenge is single-use: it is removed on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CustomerNotFound` if the email is unknown and
    /// `AuthError::InvalidOrExpiredOtp` if the challenge is absent, stale,
    /// or doesn't match the code and customer.
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        let key = OtpKey {
            purpose: OtpPurpose::Signup,
            email,
        };
        let challenge = self
            .otp
            .get(&key)
            .await
            .ok_or(AuthError::InvalidOrExpiredOtp)?;

        if !challenge.matches(code, customer.id) || challenge.is_stale(Utc::now()) {
            return Err(AuthError::InvalidOrExpiredOtp);
        }

        self.customers.mark_email_verified(customer.id).await?;
        self.otp.forget(&key).await;

        Ok(())
    }

    /// Re-issue the signup OTP, superseding any unconsumed prior code.
    ///
    /// A no-op success for an already-verified account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CustomerNotFound` if the email is unknown and
    /// `AuthError::Delivery` on notifier failure.
    pub async fn resend_otp(&self, email: &str) -> Result<AuthOutcome, AuthError> {
        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        if customer.email_verified {
            return Ok(AuthOutcome::AlreadyVerified);
        }

        self.issue_otp(OtpPurpose::Signup, &email, customer.id)
            .await?;
        Ok(AuthOutcome::OtpSent)
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotVerified` for a correct password on an
    /// unverified account (so the client can route back into verification);
    /// every other failure collapses to `AuthError::InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer, AuthError> {
        let email = Email::parse(email)?;

        let (customer, stored_hash) = self
            .customers
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &stored_hash)?;

        if !customer.email_verified {
            return Err(AuthError::NotVerified);
        }

        Ok(customer)
    }

    /// Apply the post-verification profile setup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CustomerNotFound` if the email is unknown and
    /// `AuthError::NotVerified` if the account hasn't completed the OTP
    /// challenge yet.
    pub async fn setup(&self, email: &str, profile: &ProfileUpdate) -> Result<Customer, AuthError> {
        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        if !customer.email_verified {
            return Err(AuthError::NotVerified);
        }

        Ok(self.customers.update_profile(customer.id, profile).await?)
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Issue a reset OTP under the reset-purpose key.
    ///
    /// Available to verified and unverified accounts alike; has no effect on
    /// the verification flag.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CustomerNotFound` if the email is unknown and
    /// `AuthError::Delivery` on notifier failure.
    pub async fn request_reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        self.issue_otp(OtpPurpose::PasswordReset, &email, customer.id)
            .await
    }

    /// Consume a reset OTP and mint a single-use reset grant.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CustomerNotFound` if the email is unknown and
    /// `AuthError::InvalidOrExpiredOtp` if the challenge is absent, stale,
    /// or doesn't match.
    pub async fn verify_reset_otp(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        let key = OtpKey {
            purpose: OtpPurpose::PasswordReset,
            email: email.clone(),
        };
        let challenge = self
            .otp
            .get(&key)
            .await
            .ok_or(AuthError::InvalidOrExpiredOtp)?;

        if !challenge.matches(code, customer.id) || challenge.is_stale(Utc::now()) {
            return Err(AuthError::InvalidOrExpiredOtp);
        }

        self.otp.forget(&key).await;
        self.reset_grants
            .put(
                email,
                ResetGrant {
                    customer_id: customer.id,
                    granted_at: Utc::now(),
                },
                RESET_GRANT_TTL,
            )
            .await;

        Ok(())
    }

    /// Set a new password under a live reset grant, consuming the grant.
    ///
    /// The verification flag is untouched, so the account logs in normally
    /// right after.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` / `AuthError::WeakPassword` on
    /// input problems, `AuthError::CustomerNotFound` for an unknown email,
    /// and `AuthError::ResetNotAuthorized` without a grant from
    /// [`verify_reset_otp`](Self::verify_reset_otp).
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        if new_password != confirmation {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(new_password)?;

        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        let grant = self
            .reset_grants
            .get(&email)
            .await
            .ok_or(AuthError::ResetNotAuthorized)?;
        if grant.customer_id != customer.id {
            return Err(AuthError::ResetNotAuthorized);
        }

        let password_hash = hash_password(new_password)?;
        self.customers
            .set_password_hash(customer.id, &password_hash)
            .await?;

        // Single use: a second reset needs a fresh OTP round.
        self.reset_grants.forget(&email).await;

        Ok(())
    }

    // =========================================================================
    // OTP issuance
    // =========================================================================

    /// Generate, store, and mail a challenge under `(purpose, email)`.
    ///
    /// The store write happens before the send and is not rolled back on
    /// delivery failure (at-least-once issuance).
    async fn issue_otp(
        &self,
        purpose: OtpPurpose,
        email: &Email,
        customer_id: CustomerId,
    ) -> Result<(), AuthError> {
        let code = generate_otp_code();
        self.otp
            .put(
                OtpKey {
                    purpose,
                    email: email.clone(),
                },
                OtpChallenge {
                    code: code.clone(),
                    customer_id,
                    issued_at: Utc::now(),
                },
                OTP_TTL,
            )
            .await;

        self.mailer
            .send_otp_code(email.as_str(), &code)
            .await
            .map_err(AuthError::Delivery)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("secret1").is_ok());
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(matches!(
            verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("secret1", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }
}
