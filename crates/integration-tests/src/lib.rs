//! Integration tests for Sugarloaf.
//!
//! # Running Tests
//!
//! The ignored tests drive a running stack end to end. They require:
//!
//! ```bash
//! # PostgreSQL with migrations applied
//! cargo run -p sugarloaf-cli -- migrate
//!
//! # A MailHog SMTP sink (OTP codes are read back from its API)
//! docker run -p 1025:1025 -p 8025:8025 mailhog/mailhog
//!
//! # The API server pointed at both
//! SMTP_HOST=localhost SMTP_PORT=1025 cargo run -p sugarloaf-api
//!
//! # Then
//! cargo test -p sugarloaf-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `API_BASE_URL` - API under test (default `http://localhost:3000`)
//! - `MAILHOG_URL` - MailHog API (default `http://localhost:8025`)
//! - `SUGARLOAF_DATABASE_URL` / `DATABASE_URL` - for direct seed inserts

use sqlx::PgPool;
use uuid::Uuid;

/// Base URL for the API under test.
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the MailHog API.
#[must_use]
pub fn mailhog_url() -> String {
    std::env::var("MAILHOG_URL").unwrap_or_else(|_| "http://localhost:8025".to_string())
}

/// HTTP client for the API.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// Connect to the test database for direct seed inserts.
///
/// # Panics
///
/// Panics if no database URL is configured or the connection fails.
pub async fn db_pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("SUGARLOAF_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("SUGARLOAF_DATABASE_URL or DATABASE_URL must be set");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database")
}

/// A unique email for test isolation.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@sugarloaf.test", Uuid::new_v4())
}

/// Pull the most recent OTP code MailHog captured for `email`.
///
/// # Panics
///
/// Panics if MailHog is unreachable or no message carries a code.
pub async fn latest_otp_for(email: &str) -> String {
    let body: serde_json::Value = client()
        .get(format!(
            "{}/api/v2/search?kind=to&query={email}",
            mailhog_url()
        ))
        .send()
        .await
        .expect("Failed to query MailHog")
        .json()
        .await
        .expect("Failed to parse MailHog response");

    let raw = body["items"][0]["Content"]["Body"]
        .as_str()
        .expect("No captured message for this address");

    extract_code(raw).expect("Message carried no 6-digit code")
}

/// Find the first run of exactly six consecutive ASCII digits.
#[must_use]
pub fn extract_code(body: &str) -> Option<String> {
    let bytes = body.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let run = bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if run == 6 {
            return body.get(start..start + 6).map(ToOwned::to_owned);
        }
        start += run.max(1);
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_finds_six_digit_runs() {
        assert_eq!(
            extract_code("Your code is\r\n\r\n    482913\r\n").unwrap(),
            "482913"
        );
        assert_eq!(extract_code("code: 123456.").unwrap(), "123456");
    }

    #[test]
    fn test_extract_code_skips_wrong_lengths() {
        assert!(extract_code("port 8025 and id 12345").is_none());
        assert_eq!(extract_code("12345 then 654321").unwrap(), "654321");
        assert!(extract_code("1234567 is too long").is_none());
    }
}
