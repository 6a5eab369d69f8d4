//! Admin back-office JSON API, mounted under `/admin`.
//!
//! `/admin/login` is public and rate limited; everything under `/admin/api`
//! requires an admin session.

pub mod auth;
pub mod categories;
pub mod content;
pub mod invoices;
pub mod orders;
pub mod products;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};

use crate::middleware::{login_rate_limiter, require_admin};
use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for multipart framing around the largest allowed file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .patch(products::patch)
                .delete(products::delete),
        )
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/reorder", patch(categories::reorder))
        .route(
            "/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/{id}/move", patch(categories::move_category))
}

fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/banners",
            get(content::list_banners).post(content::create_banner),
        )
        .route(
            "/banners/{id}",
            get(content::show_banner)
                .put(content::update_banner)
                .delete(content::delete_banner),
        )
        .route(
            "/feature-icons",
            get(content::list_feature_icons).post(content::create_feature_icon),
        )
        .route(
            "/feature-icons/{id}",
            get(content::show_feature_icon)
                .put(content::update_feature_icon)
                .delete(content::delete_feature_icon),
        )
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/status", patch(orders::bulk_status))
        .route(
            "/{id}",
            get(orders::show).put(orders::update).delete(orders::delete),
        )
        .route("/{id}/invoice", post(orders::issue_invoice))
}

fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(invoices::index))
        .route("/{id}", get(invoices::show).delete(invoices::delete))
        .route("/{id}/pdf", post(invoices::regenerate_pdf))
        .route("/{id}/qr", get(invoices::qr))
}

/// Routes behind the admin gate.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/orders", order_routes())
        .nest("/invoices", invoice_routes())
        .merge(content_routes())
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route_layer(axum::middleware::from_fn(require_admin))
}

/// All admin routes.
pub fn routes() -> Router<AppState> {
    let login = Router::new()
        .route("/login", post(auth::login))
        .layer(login_rate_limiter());

    Router::new()
        .merge(login)
        .route("/logout", post(auth::logout))
        .nest("/api", api_routes())
}
