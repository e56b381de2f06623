//! Product domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use sugarloaf_core::{CategoryId, ProductId};

/// A catalog product.
///
/// `stock` is the only field order placement mutates; everything else is
/// catalog-managed.
#[derive(Debug, Clone)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Unit price. Non-negative.
    pub price: Decimal,
    /// Units on hand. Non-negative; decremented by order placement.
    pub stock: i32,
    /// Media reference for the product image.
    pub image: Option<String>,
    /// Optional category (pure lookup).
    pub category_id: Option<CategoryId>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}
