//! Order placement engine.
//!
//! Validates requests against live state and delegates the atomic work to
//! the transactional order repository.

use sqlx::PgPool;
use thiserror::Error;

use sugarloaf_core::{CustomerId, OrderId, OrderLineId, ProductId};

use crate::db::RepositoryError;
use crate::db::customers::CustomerRepository;
use crate::db::orders::{NewOrderLine, OrderRepository};
use crate::models::{Order, OrderLine};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Customer not found.
    #[error("customer not found")]
    CustomerNotFound,

    /// Order not found.
    #[error("order not found")]
    OrderNotFound,

    /// Order line not found under the order.
    #[error("order item not found")]
    LineNotFound,

    /// A referenced product doesn't exist.
    #[error("product not found")]
    ProductNotFound,

    /// Quantity was zero or negative.
    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    /// Stock can't cover the requested quantity; the whole request was
    /// rolled back.
    #[error("not enough stock for product: {product}")]
    InsufficientStock {
        /// Display name of the short product.
        product: String,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order placement and line management.
pub struct OrderService<'a> {
    customers: CustomerRepository<'a>,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            customers: CustomerRepository::new(pool),
            orders: OrderRepository::new(pool),
        }
    }

    /// Place a multi-line order. All lines succeed or none do; stock for
    /// every line is decremented (conditionally) inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidQuantity` for non-positive quantities,
    /// `OrderError::CustomerNotFound` / `OrderError::ProductNotFound` for
    /// dangling references, and `OrderError::InsufficientStock` with the
    /// product's name when a line can't be covered.
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        lines: &[NewOrderLine],
    ) -> Result<Order, OrderError> {
        if lines.iter().any(|line| line.quantity <= 0) {
            return Err(OrderError::InvalidQuantity);
        }

        // Fast-path existence check; the FK on orders.customer_id is the
        // final authority inside the transaction.
        self.customers
            .get_by_id(customer_id)
            .await?
            .ok_or(OrderError::CustomerNotFound)?;

        self.orders
            .place(customer_id, lines)
            .await
            .map_err(map_placement_error)
    }

    /// Add a line to an existing order, re-validating stock and recomputing
    /// the stored total.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` / `OrderError::ProductNotFound`
    /// for dangling references, `OrderError::InvalidQuantity` for
    /// non-positive quantities, and `OrderError::InsufficientStock` when the
    /// decrement can't be covered.
    pub async fn add_line(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<OrderLine, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity);
        }

        self.orders
            .get(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;

        self.orders
            .add_line(order_id, product_id, quantity)
            .await
            .map_err(map_placement_error)
    }

    /// Change a line's quantity, applying the net stock delta.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::LineNotFound` if the line doesn't exist under
    /// the order, `OrderError::InvalidQuantity` for non-positive quantities,
    /// and `OrderError::InsufficientStock` when growth can't be covered.
    pub async fn update_line(
        &self,
        order_id: OrderId,
        line_id: OrderLineId,
        quantity: i32,
    ) -> Result<OrderLine, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity);
        }

        self.orders
            .update_line_quantity(order_id, line_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::LineNotFound,
                RepositoryError::InsufficientStock(product) => {
                    OrderError::InsufficientStock { product }
                }
                other => OrderError::Repository(other),
            })
    }

    /// Remove a line, restocking its units.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::LineNotFound` if the line doesn't exist under
    /// the order.
    pub async fn remove_line(
        &self,
        order_id: OrderId,
        line_id: OrderLineId,
    ) -> Result<(), OrderError> {
        self.orders
            .remove_line(order_id, line_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::LineNotFound,
                other => OrderError::Repository(other),
            })
    }
}

/// Map repository outcomes from placement paths, where a missing row can
/// only be a product (the order/customer were checked first).
fn map_placement_error(e: RepositoryError) -> OrderError {
    match e {
        RepositoryError::NotFound => OrderError::ProductNotFound,
        RepositoryError::InsufficientStock(product) => OrderError::InsufficientStock { product },
        other => OrderError::Repository(other),
    }
}
