//! Database operations for the Sugarloaf `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `customers` - Accounts with OTP verification state (soft-deletable)
//! - `categories` - Product category lookup
//! - `products` - Catalog with live stock counts
//! - `orders` / `order_items` - Orders with price-snapshot lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p sugarloaf-cli -- migrate
//! ```
//!
//! Queries use sqlx's runtime API with `FromRow` row structs that convert
//! into domain types via `TryFrom`, so the crate builds without a live
//! database.

pub mod customers;
pub mod orders;
pub mod products;

pub use customers::CustomerRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A conditional stock decrement did not apply.
    ///
    /// Raised at the storage boundary, where the oversell race is actually
    /// decided; carries the product name for the caller's message.
    #[error("not enough stock for product: {0}")]
    InsufficientStock(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
