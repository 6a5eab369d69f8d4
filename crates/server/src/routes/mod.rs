//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready        - Liveness and readiness
//!
//! # Storefront (/api)
//! GET  /api/products                 - Active products (filter, sort, paginate)
//! GET  /api/products/{slug}          - Product detail
//! GET  /api/categories               - Category tree
//! GET  /api/categories/{slug}        - Category, breadcrumbs and children
//! GET  /api/banners                  - Active banners
//! GET  /api/feature-icons            - Active feature icons
//! GET|DELETE /api/cart               - Session cart
//! POST|PATCH|DELETE /api/cart/items  - Cart lines
//! POST /api/cart/checkout            - Order from the session cart
//! POST /api/orders                   - Order from inline items
//! GET  /api/orders/{number}/payment-qr - Bank-transfer QR (SVG)
//!
//! # Admin (/admin) - see [`admin`]
//! ```

pub mod admin;
pub mod cart;
pub mod categories;
pub mod content;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::{order_rate_limiter, security_headers_middleware};
use crate::state::AppState;

/// Public storefront API, mounted under `/api`.
fn api_routes() -> Router<AppState> {
    let order_creation = Router::new()
        .route("/orders", post(orders::create))
        .route("/cart/checkout", post(cart::checkout))
        .layer(order_rate_limiter());

    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(categories::tree))
        .route("/categories/{slug}", get(categories::show))
        .route("/banners", get(content::banners))
        .route("/feature-icons", get(content::feature_icons))
        .route("/cart", get(cart::show).delete(cart::clear))
        .route(
            "/cart/items",
            post(cart::add_item)
                .patch(cart::update_item)
                .delete(cart::remove_item),
        )
        .route("/orders/{number}/payment-qr", get(orders::payment_qr))
        .merge(order_creation)
}

/// All application routes.
pub fn routes() -> Router<AppState> {
    let security_headers = axum::middleware::from_fn(security_headers_middleware);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes().layer(security_headers.clone()))
        .nest("/admin", admin::routes().layer(security_headers))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
