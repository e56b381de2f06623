//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use sugarloaf_core::{CustomerId, OrderId, OrderLineId, OrderStatus, ProductId};

/// An order header.
///
/// `total_amount` always equals the sum of `quantity * price` over the
/// order's lines at the end of the transaction that last touched them.
#[derive(Debug, Clone)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Customer who placed the order.
    pub customer_id: CustomerId,
    /// Lifecycle status; orders are created `pending`.
    pub status: OrderStatus,
    /// Derived total, never client-supplied.
    pub total_amount: Decimal,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A single order line.
#[derive(Debug, Clone)]
pub struct OrderLine {
    /// Unique line ID.
    pub id: OrderLineId,
    /// Owning order.
    pub order_id: OrderId,
    /// Ordered product.
    pub product_id: ProductId,
    /// Ordered quantity. Always positive.
    pub quantity: i32,
    /// Unit price snapshotted at purchase time, decoupled from later
    /// catalog price changes.
    pub price: Decimal,
    /// When the line was created.
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Line subtotal (`quantity * price`).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtotal() {
        let line = OrderLine {
            id: OrderLineId::new(1),
            order_id: OrderId::new(1),
            product_id: ProductId::new(1),
            quantity: 3,
            price: Decimal::new(1999, 2), // 19.99
            created_at: Utc::now(),
        };
        assert_eq!(line.subtotal(), Decimal::new(5997, 2));
    }
}
