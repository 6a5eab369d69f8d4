//! Shoply server: storefront JSON API and admin back-office.
//!
//! The binary in `main.rs` loads configuration, sets up logging and Sentry,
//! and serves [`app`]. The library is split out so the router can be built
//! from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::session::SessionConfigError;
use crate::services::uploads::UPLOADS_PREFIX;
use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// # Errors
///
/// Returns `SessionConfigError` if the session store cannot be configured.
pub fn app(state: AppState) -> Result<Router, SessionConfigError> {
    let session_layer = middleware::create_session_layer(state.pool(), state.config())?;
    let uploads = ServeDir::new(&state.config().upload_dir);

    Ok(Router::new()
        .merge(routes::routes())
        .nest_service(UPLOADS_PREFIX, uploads)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}
