//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Customer auth & profile
//! POST /api/customer/auth                    - Signup-or-login, issues OTP
//! POST /api/customer/verify                  - Consume signup OTP
//! POST /api/customer/resend-otp              - Re-issue signup OTP
//! POST /api/customer/login                   - Password login (verified only)
//! POST /api/customer/setup                   - Post-verification profile setup
//! GET  /api/customer/show                    - Profile lookup by email
//! POST /api/customer/photo                   - Replace profile photo (multipart)
//! POST /api/customer/request-reset-password  - Issue reset OTP
//! POST /api/customer/verify-reset-otp        - Consume reset OTP
//! POST /api/customer/reset-password          - Set new password under grant
//!
//! # Orders
//! POST   /api/orders/place                   - Place order (all-or-nothing)
//! GET    /api/orders                         - List orders
//! GET    /api/orders/customer/{customer_id}  - List a customer's orders
//! GET    /api/orders/{id}                    - Order with lines
//! GET    /api/orders/{id}/items              - List lines
//! POST   /api/orders/{id}/items              - Add line
//! PUT    /api/orders/{id}/items/{item_id}    - Update line quantity
//! DELETE /api/orders/{id}/items/{item_id}    - Remove line
//!
//! # Products
//! GET    /api/products                       - List products
//! POST   /api/products                       - Create product (multipart)
//! GET    /api/products/{id}                  - Product detail
//! PUT    /api/products/{id}                  - Update product (multipart)
//! DELETE /api/products/{id}                  - Delete product
//! ```
//!
//! The customer auth endpoints sit behind the strict rate limiter; the rest
//! of the API behind the relaxed one. Stored media is served under `/media`.

pub mod customers;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Build the `/api` route tree.
pub fn routes() -> Router<AppState> {
    let customer_auth = Router::new()
        .route("/customer/auth", post(customers::auth))
        .route("/customer/verify", post(customers::verify))
        .route("/customer/resend-otp", post(customers::resend_otp))
        .route("/customer/login", post(customers::login))
        .route(
            "/customer/request-reset-password",
            post(customers::request_reset_password),
        )
        .route("/customer/verify-reset-otp", post(customers::verify_reset_otp))
        .route("/customer/reset-password", post(customers::reset_password))
        .layer(auth_rate_limiter());

    let general = Router::new()
        // Customer profile
        .route("/customer/setup", post(customers::setup))
        .route("/customer/show", get(customers::show))
        .route("/customer/photo", post(customers::update_photo))
        // Orders
        .route("/orders/place", post(orders::place))
        .route("/orders", get(orders::index))
        .route("/orders/customer/{customer_id}", get(orders::list_by_customer))
        .route("/orders/{id}", get(orders::show))
        .route(
            "/orders/{order_id}/items",
            get(orders::items_index).post(orders::items_store),
        )
        .route(
            "/orders/{order_id}/items/{item_id}",
            put(orders::items_update).delete(orders::items_destroy),
        )
        // Products
        .route("/products", get(products::index).post(products::store))
        .route(
            "/products/{id}",
            get(products::show).put(products::update).delete(products::destroy),
        )
        .layer(api_rate_limiter());

    Router::new().nest("/api", customer_auth.merge(general))
}
