//! End-to-end tests for the OTP-gated signup, login, and reset flows.
//!
//! These tests require a running API server, `PostgreSQL`, and a MailHog
//! SMTP sink (see the crate docs for the exact setup). OTP codes are read
//! back from MailHog's API.

use reqwest::StatusCode;
use serde_json::{Value, json};

use sugarloaf_integration_tests::{api_base_url, client, latest_otp_for, unique_email};

async fn post(path: &str, body: Value) -> reqwest::Response {
    client()
        .post(format!("{}{path}", api_base_url()))
        .json(&body)
        .send()
        .await
        .expect("request failed")
}

#[tokio::test]
#[ignore = "Requires running API server, PostgreSQL, and MailHog"]
async fn test_signup_verify_login_flow() {
    let email = unique_email();

    // auth creates the customer and issues an OTP
    let resp = post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(body["message"], "OTP sent to email");

    // login before verification is rejected with the distinct not-verified kind
    let resp = post(
        "/api/customer/login",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // the mailed code verifies the account
    let code = latest_otp_for(&email).await;
    let resp = post(
        "/api/customer/verify",
        json!({ "email": email, "otp": code }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // login now returns profile data, no error
    let resp = post(
        "/api/customer/login",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["data"]["email"], email.as_str());
}

#[tokio::test]
#[ignore = "Requires running API server, PostgreSQL, and MailHog"]
async fn test_repeat_auth_reissues_otp_without_duplicating_customer() {
    let email = unique_email();

    let resp = post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first_code = latest_otp_for(&email).await;

    // Same credentials again: resumes the interrupted signup, supersedes the code
    let resp = post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second_code = latest_otp_for(&email).await;

    // The superseded code no longer verifies (unless the draw repeated)
    if first_code != second_code {
        let resp = post(
            "/api/customer/verify",
            json!({ "email": email, "otp": first_code }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let resp = post(
        "/api/customer/verify",
        json!({ "email": email, "otp": second_code }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server, PostgreSQL, and MailHog"]
async fn test_verify_is_single_use() {
    let email = unique_email();

    post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    let code = latest_otp_for(&email).await;

    let resp = post(
        "/api/customer/verify",
        json!({ "email": email, "otp": code }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The same code again fails: the challenge was consumed
    let resp = post(
        "/api/customer/verify",
        json!({ "email": email, "otp": code }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server, PostgreSQL, and MailHog"]
async fn test_auth_with_wrong_password_is_rejected() {
    let email = unique_email();

    post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;

    let resp = post(
        "/api/customer/auth",
        json!({ "email": email, "password": "different" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server, PostgreSQL, and MailHog"]
async fn test_already_verified_auth_short_circuits() {
    let email = unique_email();

    post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    let code = latest_otp_for(&email).await;
    post(
        "/api/customer/verify",
        json!({ "email": email, "otp": code }),
    )
    .await;

    // No new OTP for a verified account
    let resp = post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(body["message"], "Account already verified, please log in");
}

#[tokio::test]
#[ignore = "Requires running API server, PostgreSQL, and MailHog"]
async fn test_password_reset_flow() {
    let email = unique_email();

    // Verified account
    post(
        "/api/customer/auth",
        json!({ "email": email, "password": "secret1" }),
    )
    .await;
    let code = latest_otp_for(&email).await;
    post(
        "/api/customer/verify",
        json!({ "email": email, "otp": code }),
    )
    .await;

    // Reset without a grant is refused
    let resp = post(
        "/api/customer/reset-password",
        json!({
            "email": email,
            "password": "newsecret",
            "password_confirmation": "newsecret"
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Request + verify the reset OTP, then reset
    post(
        "/api/customer/request-reset-password",
        json!({ "email": email }),
    )
    .await;
    let reset_code = latest_otp_for(&email).await;
    let resp = post(
        "/api/customer/verify-reset-otp",
        json!({ "email": email, "otp": reset_code }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post(
        "/api/customer/reset-password",
        json!({
            "email": email,
            "password": "newsecret",
            "password_confirmation": "newsecret"
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The grant was consumed: a second reset needs a fresh OTP round
    let resp = post(
        "/api/customer/reset-password",
        json!({
            "email": email,
            "password": "thirdsecret",
            "password_confirmation": "thirdsecret"
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The account stays verified and logs in with the new password
    let resp = post(
        "/api/customer/login",
        json!({ "email": email, "password": "newsecret" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_validation_errors_are_per_field() {
    let resp = post("/api/customer/auth", json!({ "email": "not-an-email" })).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = resp.json().await.expect("invalid json");
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
}
