//! HTTP middleware.

pub mod rate_limit;

pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
