//! Seed the catalog with sample data for local development.
//!
//! Idempotent: categories are upserted by name and products are only
//! inserted when the table is empty.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::migrate::{MigrationError, database_url};

/// Sample products: name, price, stock, category.
const SAMPLE_PRODUCTS: &[(&str, &str, i32, &str)] = &[
    ("Sugarloaf Pineapple", "6.50", 40, "Fruit"),
    ("Dragon Fruit", "4.25", 25, "Fruit"),
    ("Passionfruit Box", "12.00", 10, "Fruit"),
    ("Cold-Pressed Pineapple Juice", "5.75", 60, "Drinks"),
    ("Dried Mango Strips", "7.90", 35, "Snacks"),
];

/// Insert sample categories and products.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or an insert
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let pool = PgPool::connect(&database_url()?).await?;

    let (product_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await?;
    if product_count > 0 {
        tracing::info!("Products already present, nothing to seed");
        return Ok(());
    }

    for (name, price, stock, category) in SAMPLE_PRODUCTS {
        let (category_id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO categories (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(category)
        .fetch_one(&pool)
        .await?;

        let price: Decimal = price.parse().unwrap_or_default();
        sqlx::query(
            r"
            INSERT INTO products (name, price, stock, category_id)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(name)
        .bind(price)
        .bind(stock)
        .bind(category_id)
        .execute(&pool)
        .await?;

        tracing::info!(name, "seeded product");
    }

    tracing::info!("Seed complete!");
    Ok(())
}
