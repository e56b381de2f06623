//! End-to-end tests for order placement and stock accounting.
//!
//! Customers and products are seeded directly through sqlx; the placement
//! itself goes through the HTTP API.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use sugarloaf_integration_tests::{api_base_url, client, db_pool, unique_email};

async fn seed_customer(pool: &PgPool) -> i32 {
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO customers (email, password_hash, email_verified)
        VALUES ($1, 'x', TRUE)
        RETURNING id
        ",
    )
    .bind(unique_email())
    .fetch_one(pool)
    .await
    .expect("failed to seed customer");
    id
}

async fn seed_product(pool: &PgPool, name: &str, price: &str, stock: i32) -> i32 {
    let price: Decimal = price.parse().expect("bad price literal");
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO products (name, price, stock)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("failed to seed product");
    id
}

async fn stock_of(pool: &PgPool, product_id: i32) -> i32 {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("failed to read stock");
    stock
}

async fn place(body: Value) -> reqwest::Response {
    client()
        .post(format!("{}/api/orders/place", api_base_url()))
        .json(&body)
        .send()
        .await
        .expect("request failed")
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_place_order_decrements_stock_and_snapshots_price() {
    let pool = db_pool().await;
    let customer_id = seed_customer(&pool).await;
    let product_id = seed_product(&pool, "Sugarloaf Pineapple", "6.50", 5).await;

    let resp = place(json!({
        "customer_id": customer_id,
        "items": [{ "product_id": product_id, "quantity": 3 }],
    }))
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("invalid json");
    let order_id = body["order_id"].as_i64().expect("missing order_id");

    // stock 5 -> 2
    assert_eq!(stock_of(&pool, product_id).await, 2);

    // total = 3 x 6.50, one line with the snapshotted price
    let detail: Value = client()
        .get(format!("{}/api/orders/{order_id}", api_base_url()))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(detail["data"]["order"]["total_amount"], "19.50");
    let items = detail["data"]["items"].as_array().expect("missing items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["price"], "6.50");

    // A later catalog price change must not move the snapshot
    sqlx::query("UPDATE products SET price = 9.99 WHERE id = $1")
        .bind(product_id)
        .execute(&pool)
        .await
        .expect("failed to reprice");
    let detail: Value = client()
        .get(format!("{}/api/orders/{order_id}", api_base_url()))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(detail["data"]["items"][0]["price"], "6.50");
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_insufficient_stock_rolls_back_every_line() {
    let pool = db_pool().await;
    let customer_id = seed_customer(&pool).await;
    let plenty = seed_product(&pool, "Dried Mango Strips", "7.90", 50).await;
    let scarce = seed_product(&pool, "Passionfruit Box", "12.00", 1).await;

    let resp = place(json!({
        "customer_id": customer_id,
        "items": [
            { "product_id": plenty, "quantity": 2 },
            { "product_id": scarce, "quantity": 4 },
        ],
    }))
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(
        body["message"],
        "Not enough stock for product: Passionfruit Box"
    );

    // All-or-nothing: the first line's decrement was rolled back too
    assert_eq!(stock_of(&pool, plenty).await, 50);
    assert_eq!(stock_of(&pool, scarce).await, 1);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_concurrent_placement_of_last_unit() {
    let pool = db_pool().await;
    let customer_id = seed_customer(&pool).await;
    let product_id = seed_product(&pool, "Dragon Fruit", "4.25", 1).await;

    let body = json!({
        "customer_id": customer_id,
        "items": [{ "product_id": product_id, "quantity": 1 }],
    });
    let (first, second) = tokio::join!(place(body.clone()), place(body));

    let statuses = [first.status(), second.status()];
    let wins = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let losses = statuses
        .iter()
        .filter(|s| **s == StatusCode::BAD_REQUEST)
        .count();

    // Exactly one request gets the last unit
    assert_eq!(wins, 1, "statuses: {statuses:?}");
    assert_eq!(losses, 1, "statuses: {statuses:?}");
    assert_eq!(stock_of(&pool, product_id).await, 0);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_line_management_revalidates_stock_and_recomputes_total() {
    let pool = db_pool().await;
    let customer_id = seed_customer(&pool).await;
    let product_id = seed_product(&pool, "Cold-Pressed Pineapple Juice", "5.75", 10).await;

    let resp = place(json!({
        "customer_id": customer_id,
        "items": [{ "product_id": product_id, "quantity": 2 }],
    }))
    .await;
    let body: Value = resp.json().await.expect("invalid json");
    let order_id = body["order_id"].as_i64().expect("missing order_id");

    // Grow the line: stock 8 -> 5, total recomputed
    let detail: Value = client()
        .get(format!("{}/api/orders/{order_id}/items", api_base_url()))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    let item_id = detail["data"][0]["id"].as_i64().expect("missing item id");

    let resp = client()
        .put(format!(
            "{}/api/orders/{order_id}/items/{item_id}",
            api_base_url()
        ))
        .json(&json!({ "quantity": 5 }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stock_of(&pool, product_id).await, 5);

    let detail: Value = client()
        .get(format!("{}/api/orders/{order_id}", api_base_url()))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(detail["data"]["order"]["total_amount"], "28.75");

    // Growth beyond stock is refused and changes nothing
    let resp = client()
        .put(format!(
            "{}/api/orders/{order_id}/items/{item_id}",
            api_base_url()
        ))
        .json(&json!({ "quantity": 11 }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&pool, product_id).await, 5);

    // Removal restocks and zeroes the total
    let resp = client()
        .delete(format!(
            "{}/api/orders/{order_id}/items/{item_id}",
            api_base_url()
        ))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stock_of(&pool, product_id).await, 10);

    let detail: Value = client()
        .get(format!("{}/api/orders/{order_id}", api_base_url()))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(detail["data"]["order"]["total_amount"], "0.00");
}
