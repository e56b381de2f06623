//! Order route handlers: placement, reads, and line management.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sugarloaf_core::{CustomerId, OrderId, OrderLineId, OrderStatus, ProductId};

use crate::db::orders::{NewOrderLine, OrderRepository};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderLine};
use crate::services::orders::OrderService;
use crate::state::AppState;
use crate::validate::FieldErrors;

// =============================================================================
// Request / Response Types
// =============================================================================

/// A requested line in a place-order call.
#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Option<i32>,
    pub quantity: Option<i32>,
}

/// Place-order request body.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: Option<i32>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

/// Add-line request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<i32>,
    pub quantity: Option<i32>,
}

/// Update-line request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Option<i32>,
}

/// Order payload.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Order line payload with the snapshotted unit price.
#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.id,
            order_id: line.order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        }
    }
}

// =============================================================================
// Placement
// =============================================================================

/// Place a multi-line order. All lines succeed or none do.
///
/// POST /api/orders/place
pub async fn place(
    State(state): State<AppState>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<Value>> {
    let mut errors = FieldErrors::new();
    if req.customer_id.is_none() {
        errors.add("customer_id", "The customer id field is required.");
    }
    if req.items.is_empty() {
        errors.add("items", "The items field is required.");
    }
    for (index, item) in req.items.iter().enumerate() {
        if item.product_id.is_none() {
            errors.add(
                format!("items.{index}.product_id"),
                "The product id field is required.",
            );
        }
        match item.quantity {
            None => errors.add(
                format!("items.{index}.quantity"),
                "The quantity field is required.",
            ),
            Some(q) if q < 1 => errors.add(
                format!("items.{index}.quantity"),
                "The quantity must be at least 1.",
            ),
            Some(_) => {}
        }
    }
    errors.into_result()?;

    let Some(customer_id) = req.customer_id else {
        return Err(AppError::BadRequest("missing customer_id".to_owned()));
    };
    let lines: Vec<NewOrderLine> = req
        .items
        .iter()
        .filter_map(|item| {
            Some(NewOrderLine {
                product_id: ProductId::new(item.product_id?),
                quantity: item.quantity?,
            })
        })
        .collect();

    let order = OrderService::new(state.pool())
        .place_order(CustomerId::new(customer_id), &lines)
        .await?;

    Ok(Json(json!({
        "message": "Order placed",
        "order_id": order.id,
    })))
}

// =============================================================================
// Reads
// =============================================================================

/// List all orders, newest first.
///
/// GET /api/orders
pub async fn index(State(state): State<AppState>) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool()).list().await?;
    let data: Vec<OrderResponse> = orders.iter().map(OrderResponse::from).collect();
    Ok(Json(json!({ "data": data })))
}

/// List a customer's orders.
///
/// GET /api/orders/customer/{customer_id}
pub async fn list_by_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i32>,
) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_customer(CustomerId::new(customer_id))
        .await?;
    let data: Vec<OrderResponse> = orders.iter().map(OrderResponse::from).collect();
    Ok(Json(json!({ "data": data })))
}

/// Show an order with its lines.
///
/// GET /api/orders/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))?;
    let lines = orders.lines(order.id).await?;

    let items: Vec<OrderLineResponse> = lines.iter().map(OrderLineResponse::from).collect();
    Ok(Json(json!({
        "data": {
            "order": OrderResponse::from(&order),
            "items": items,
        }
    })))
}

// =============================================================================
// Line Management
// =============================================================================

/// List an order's lines.
///
/// GET /api/orders/{order_id}/items
pub async fn items_index(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(OrderId::new(order_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))?;
    let lines = orders.lines(order.id).await?;

    let data: Vec<OrderLineResponse> = lines.iter().map(OrderLineResponse::from).collect();
    Ok(Json(json!({ "data": data })))
}

/// Add a line to an order.
///
/// POST /api/orders/{order_id}/items
pub async fn items_store(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Value>> {
    let mut errors = FieldErrors::new();
    if req.product_id.is_none() {
        errors.add("product_id", "The product id field is required.");
    }
    match req.quantity {
        None => errors.add("quantity", "The quantity field is required."),
        Some(q) if q < 1 => errors.add("quantity", "The quantity must be at least 1."),
        Some(_) => {}
    }
    errors.into_result()?;

    let (Some(product_id), Some(quantity)) = (req.product_id, req.quantity) else {
        return Err(AppError::BadRequest("missing fields".to_owned()));
    };

    let line = OrderService::new(state.pool())
        .add_line(
            OrderId::new(order_id),
            ProductId::new(product_id),
            quantity,
        )
        .await?;

    Ok(Json(json!({
        "message": "Order item added",
        "data": OrderLineResponse::from(&line),
    })))
}

/// Change a line's quantity.
///
/// PUT /api/orders/{order_id}/items/{item_id}
pub async fn items_update(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(i32, i32)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Value>> {
    let mut errors = FieldErrors::new();
    match req.quantity {
        None => errors.add("quantity", "The quantity field is required."),
        Some(q) if q < 1 => errors.add("quantity", "The quantity must be at least 1."),
        Some(_) => {}
    }
    errors.into_result()?;

    let Some(quantity) = req.quantity else {
        return Err(AppError::BadRequest("missing quantity".to_owned()));
    };

    let line = OrderService::new(state.pool())
        .update_line(OrderId::new(order_id), OrderLineId::new(item_id), quantity)
        .await?;

    Ok(Json(json!({
        "message": "Order item updated",
        "data": OrderLineResponse::from(&line),
    })))
}

/// Remove a line, restocking its units.
///
/// DELETE /api/orders/{order_id}/items/{item_id}
pub async fn items_destroy(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(i32, i32)>,
) -> Result<Json<Value>> {
    OrderService::new(state.pool())
        .remove_line(OrderId::new(order_id), OrderLineId::new(item_id))
        .await?;

    Ok(Json(json!({ "message": "Order item deleted" })))
}
