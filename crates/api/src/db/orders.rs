//! Order repository: transactional placement and line management.
//!
//! Placement is all-or-nothing: the order header, every conditional stock
//! decrement, and every line insert happen in one transaction, so a failed
//! line rolls back the lines before it. Line add/update/remove likewise run
//! transactionally, re-validating stock for the net change and recomputing
//! the stored total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use sugarloaf_core::{CustomerId, OrderId, OrderLineId, OrderStatus, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::models::{Order, OrderLine};

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    status: OrderStatus,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            status: row.status,
            total_amount: row.total_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for order line queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    quantity: i32,
    price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

/// Product fields read inside a placement transaction.
#[derive(Debug, sqlx::FromRow)]
struct ProductSnapshot {
    name: String,
    price: Decimal,
}

/// A requested order line.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order: header first (for a stable id), then per line in
    /// caller order a price snapshot, a conditional stock decrement, and the
    /// line insert; finally the accumulated total. One transaction - any
    /// failure rolls back every decrement and insert.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if a referenced product doesn't
    /// exist, `RepositoryError::InsufficientStock` (with the product name) if
    /// a decrement doesn't apply, and `RepositoryError::Database` for other
    /// database errors.
    pub async fn place(
        &self,
        customer_id: CustomerId,
        lines: &[NewOrderLine],
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order: OrderRow = sqlx::query_as(
            r"
            INSERT INTO orders (customer_id, total_amount)
            VALUES ($1, 0)
            RETURNING id, customer_id, status, total_amount, created_at, updated_at
            ",
        )
        .bind(customer_id.as_i32())
        .fetch_one(&mut *tx)
        .await?;

        let mut total = Decimal::ZERO;

        for line in lines {
            let product: ProductSnapshot =
                sqlx::query_as("SELECT name, price FROM products WHERE id = $1")
                    .bind(line.product_id.as_i32())
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;

            let decremented =
                ProductRepository::decrement_stock(&mut *tx, line.product_id, line.quantity)
                    .await?;
            if !decremented {
                return Err(RepositoryError::InsufficientStock(product.name));
            }

            sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order.id)
            .bind(line.product_id.as_i32())
            .bind(line.quantity)
            .bind(product.price)
            .execute(&mut *tx)
            .await?;

            total += Decimal::from(line.quantity) * product.price;
        }

        let order: OrderRow = sqlx::query_as(
            r"
            UPDATE orders
            SET total_amount = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, customer_id, status, total_amount, created_at, updated_at
            ",
        )
        .bind(order.id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Order::from(order))
    }

    /// Get an order by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, status, total_amount, created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// List all orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, status, total_amount, created_at, updated_at
            FROM orders
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// List a customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, status, total_amount, created_at, updated_at
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(customer_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// List an order's lines, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows: Vec<OrderLineRow> = sqlx::query_as(
            r"
            SELECT id, order_id, product_id, quantity, price, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(order_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Add a line to an existing order, decrementing stock and recomputing
    /// the order total in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order or product doesn't
    /// exist, `RepositoryError::InsufficientStock` if the decrement doesn't
    /// apply, and `RepositoryError::Database` for other database errors.
    pub async fn add_line(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM orders WHERE id = $1")
            .bind(order_id.as_i32())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let product: ProductSnapshot =
            sqlx::query_as("SELECT name, price FROM products WHERE id = $1")
                .bind(product_id.as_i32())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let decremented = ProductRepository::decrement_stock(&mut *tx, product_id, quantity).await?;
        if !decremented {
            return Err(RepositoryError::InsufficientStock(product.name));
        }

        let line: OrderLineRow = sqlx::query_as(
            r"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, product_id, quantity, price, created_at
            ",
        )
        .bind(order_id.as_i32())
        .bind(product_id.as_i32())
        .bind(quantity)
        .bind(product.price)
        .fetch_one(&mut *tx)
        .await?;

        Self::recompute_total(&mut *tx, order_id).await?;
        tx.commit().await?;

        Ok(OrderLine::from(line))
    }

    /// Change a line's quantity, applying the stock delta (conditional
    /// decrement for growth, restock for shrinkage) and recomputing the
    /// order total. The snapshotted unit price is untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist under
    /// the order, `RepositoryError::InsufficientStock` if growth can't be
    /// covered, and `RepositoryError::Database` for other database errors.
    pub async fn update_line_quantity(
        &self,
        order_id: OrderId,
        line_id: OrderLineId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderLineRow = sqlx::query_as(
            r"
            SELECT id, order_id, product_id, quantity, price, created_at
            FROM order_items
            WHERE id = $2 AND order_id = $1
            ",
        )
        .bind(order_id.as_i32())
        .bind(line_id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let product_id = ProductId::new(current.product_id);
        let delta = quantity - current.quantity;
        if delta > 0 {
            let product: ProductSnapshot =
                sqlx::query_as("SELECT name, price FROM products WHERE id = $1")
                    .bind(product_id.as_i32())
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;

            let decremented =
                ProductRepository::decrement_stock(&mut *tx, product_id, delta).await?;
            if !decremented {
                return Err(RepositoryError::InsufficientStock(product.name));
            }
        } else if delta < 0 {
            ProductRepository::restock(&mut *tx, product_id, -delta).await?;
        }

        let line: OrderLineRow = sqlx::query_as(
            r"
            UPDATE order_items
            SET quantity = $3
            WHERE id = $2 AND order_id = $1
            RETURNING id, order_id, product_id, quantity, price, created_at
            ",
        )
        .bind(order_id.as_i32())
        .bind(line_id.as_i32())
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        Self::recompute_total(&mut *tx, order_id).await?;
        tx.commit().await?;

        Ok(OrderLine::from(line))
    }

    /// Remove a line, returning its units to stock and recomputing the
    /// order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist under
    /// the order, and `RepositoryError::Database` for other database errors.
    pub async fn remove_line(
        &self,
        order_id: OrderId,
        line_id: OrderLineId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderLineRow = sqlx::query_as(
            r"
            SELECT id, order_id, product_id, quantity, price, created_at
            FROM order_items
            WHERE id = $2 AND order_id = $1
            ",
        )
        .bind(order_id.as_i32())
        .bind(line_id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        ProductRepository::restock(
            &mut *tx,
            ProductId::new(current.product_id),
            current.quantity,
        )
        .await?;

        sqlx::query("DELETE FROM order_items WHERE id = $2 AND order_id = $1")
            .bind(order_id.as_i32())
            .bind(line_id.as_i32())
            .execute(&mut *tx)
            .await?;

        Self::recompute_total(&mut *tx, order_id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Restore `total_amount` to the sum over surviving lines.
    async fn recompute_total(
        tx: &mut PgConnection,
        order_id: OrderId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE orders
            SET total_amount = COALESCE(
                    (SELECT SUM(quantity * price) FROM order_items WHERE order_id = $1),
                    0),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(order_id.as_i32())
        .execute(&mut *tx)
        .await?;

        Ok(())
    }
}
