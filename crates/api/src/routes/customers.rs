//! Customer route handlers: the OTP-gated auth flows plus profile
//! management.

use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sugarloaf_core::{CustomerId, Email, Gender};

use crate::db::customers::{CustomerRepository, ProfileUpdate};
use crate::error::{AppError, Result};
use crate::models::Customer;
use crate::services::auth::{AuthOutcome, AuthService};
use crate::services::media::extension_for;
use crate::state::AppState;
use crate::validate::FieldErrors;

/// Maximum accepted photo upload size (2 MB).
const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Email + password request body (auth, login).
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Email-only request body (resend, reset request).
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

/// Email + OTP request body (verify, verify reset).
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

/// Profile setup request body.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub phone: String,
}

/// Password reset request body. Expects a `password_confirmation` field.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

/// Query parameters for profile lookup.
#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    pub email: Option<String>,
}

/// Customer profile payload. Never carries the password hash or internal
/// flags.
#[derive(Debug, Serialize)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: String,
    /// Absolute URL into the media store, if a photo is set.
    pub photo: Option<String>,
}

impl CustomerProfile {
    fn new(customer: &Customer, base_url: &str) -> Self {
        Self {
            id: customer.id,
            full_name: customer.full_name.clone(),
            gender: customer.gender,
            phone: customer.phone.clone(),
            email: customer.email.as_str().to_owned(),
            photo: customer
                .photo
                .as_ref()
                .map(|reference| format!("{base_url}{reference}")),
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "The email field is required.");
    } else if Email::parse(email).is_err() {
        errors.add("email", "The email must be a valid email address.");
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.is_empty() {
        errors.add(field, format!("The {field} field is required."));
    } else if password.len() < 6 {
        errors.add(field, format!("The {field} must be at least 6 characters."));
    }
}

fn check_otp(errors: &mut FieldErrors, otp: &str) {
    if otp.is_empty() {
        errors.add("otp", "The otp field is required.");
    } else if otp.len() != 6 || !otp.bytes().all(|b| b.is_ascii_digit()) {
        errors.add("otp", "The otp must be 6 digits.");
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    check_password(&mut errors, "password", password);
    errors.into_result().map_err(Into::into)
}

fn validate_email_only(email: &str) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    errors.into_result().map_err(Into::into)
}

fn validate_otp_request(email: &str, otp: &str) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    check_otp(&mut errors, otp);
    errors.into_result().map_err(Into::into)
}

fn validate_setup(req: &SetupRequest) -> Result<ProfileUpdate> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, &req.email);

    if req.full_name.trim().is_empty() {
        errors.add("full_name", "The full name field is required.");
    } else if req.full_name.len() > 255 {
        errors.add("full_name", "The full name may not be greater than 255 characters.");
    }

    let gender = Gender::parse(req.gender.trim());
    if gender.is_none() {
        errors.add("gender", "The gender must be one of: male, female, other.");
    }

    if req.phone.trim().is_empty() {
        errors.add("phone", "The phone field is required.");
    } else if req.phone.len() > 20 {
        errors.add("phone", "The phone may not be greater than 20 characters.");
    }

    errors.into_result()?;

    let Some(gender) = gender else {
        return Err(AppError::BadRequest("invalid gender".to_owned()));
    };

    Ok(ProfileUpdate {
        full_name: req.full_name.trim().to_owned(),
        gender,
        phone: req.phone.trim().to_owned(),
    })
}

fn auth_service(state: &AppState) -> AuthService<'_> {
    AuthService::new(
        state.pool(),
        state.otp(),
        state.reset_grants(),
        state.mailer(),
    )
}

// =============================================================================
// Signup / Login Handlers
// =============================================================================

/// Signup-or-login-and-challenge.
///
/// POST /api/customer/auth
pub async fn auth(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Value>> {
    validate_credentials(&req.email, &req.password)?;

    match auth_service(&state).auth(&req.email, &req.password).await? {
        AuthOutcome::OtpSent => Ok(Json(json!({ "message": "OTP sent to email" }))),
        AuthOutcome::AlreadyVerified => Ok(Json(json!({
            "message": "Account already verified, please log in"
        }))),
    }
}

/// Consume a signup OTP.
///
/// POST /api/customer/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<Value>> {
    validate_otp_request(&req.email, &req.otp)?;

    auth_service(&state).verify(&req.email, &req.otp).await?;
    Ok(Json(json!({ "message": "OTP verified" })))
}

/// Re-issue the signup OTP.
///
/// POST /api/customer/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>> {
    validate_email_only(&req.email)?;

    match auth_service(&state).resend_otp(&req.email).await? {
        AuthOutcome::OtpSent => Ok(Json(json!({ "message": "OTP sent to email" }))),
        AuthOutcome::AlreadyVerified => Ok(Json(json!({
            "message": "Account already verified, please log in"
        }))),
    }
}

/// Password login for a verified account.
///
/// POST /api/customer/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Value>> {
    validate_credentials(&req.email, &req.password)?;

    let customer = auth_service(&state).login(&req.email, &req.password).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "data": CustomerProfile::new(&customer, &state.config().base_url),
    })))
}

// =============================================================================
// Profile Handlers
// =============================================================================

/// Post-verification profile setup.
///
/// POST /api/customer/setup
pub async fn setup(
    State(state): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<Value>> {
    let profile = validate_setup(&req)?;

    let customer = auth_service(&state).setup(&req.email, &profile).await?;
    Ok(Json(json!({
        "message": "Account setup successful",
        "data": CustomerProfile::new(&customer, &state.config().base_url),
    })))
}

/// Profile lookup by email.
///
/// GET /api/customer/show?email=...
pub async fn show(
    State(state): State<AppState>,
    Query(query): Query<ShowQuery>,
) -> Result<Json<Value>> {
    let raw = query.email.unwrap_or_default();
    validate_email_only(&raw)?;
    let email = Email::parse(&raw).map_err(|_| AppError::BadRequest("invalid email".to_owned()))?;

    let customer = CustomerRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_owned()))?;

    Ok(Json(json!({
        "data": CustomerProfile::new(&customer, &state.config().base_url),
    })))
}

/// Replace the profile photo.
///
/// POST /api/customer/photo (multipart: email, photo)
///
/// The prior blob is deleted before the new one is written, so a failed
/// write after a successful delete leaves the customer briefly photoless.
pub async fn update_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut email = String::new();
    let mut photo: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("email") => {
                email = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            Some("photo") => {
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                photo = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let mut errors = FieldErrors::new();
    check_email(&mut errors, &email);
    let ext = match &photo {
        None => {
            errors.add("photo", "The photo field is required.");
            None
        }
        Some((content_type, bytes)) => {
            if bytes.len() > MAX_PHOTO_BYTES {
                errors.add("photo", "The photo may not be greater than 2048 kilobytes.");
            }
            let ext = extension_for(content_type);
            if ext.is_none() {
                errors.add("photo", "The photo must be a file of type: jpeg, png, jpg.");
            }
            ext
        }
    };
    errors.into_result()?;
    let (Some((_, bytes)), Some(ext)) = (photo, ext) else {
        return Err(AppError::BadRequest("invalid photo upload".to_owned()));
    };

    let parsed =
        Email::parse(&email).map_err(|_| AppError::BadRequest("invalid email".to_owned()))?;
    let customers = CustomerRepository::new(state.pool());
    let customer = customers
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_owned()))?;

    if let Some(old) = &customer.photo {
        state.media().delete(old).await?;
    }
    let reference = state.media().put("customers", ext, &bytes).await?;
    let customer = customers
        .update_photo(customer.id, Some(&reference))
        .await?;

    Ok(Json(json!({
        "message": "Profile photo updated",
        "data": CustomerProfile::new(&customer, &state.config().base_url),
    })))
}

// =============================================================================
// Password Reset Handlers
// =============================================================================

/// Issue a reset OTP.
///
/// POST /api/customer/request-reset-password
pub async fn request_reset_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>> {
    validate_email_only(&req.email)?;

    auth_service(&state).request_reset_password(&req.email).await?;
    Ok(Json(json!({ "message": "OTP sent to email" })))
}

/// Consume a reset OTP and authorize the reset.
///
/// POST /api/customer/verify-reset-otp
pub async fn verify_reset_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<Value>> {
    validate_otp_request(&req.email, &req.otp)?;

    auth_service(&state)
        .verify_reset_otp(&req.email, &req.otp)
        .await?;
    Ok(Json(json!({
        "message": "OTP verified, you can now reset your password"
    })))
}

/// Set a new password under a live reset grant.
///
/// POST /api/customer/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, &req.email);
    check_password(&mut errors, "password", &req.password);
    if req.password_confirmation.is_empty() {
        errors.add(
            "password_confirmation",
            "The password confirmation field is required.",
        );
    }
    errors.into_result()?;

    auth_service(&state)
        .reset_password(&req.email, &req.password, &req.password_confirmation)
        .await?;
    Ok(Json(json!({ "message": "Password reset successful" })))
}
