//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Security headers (API responses only)
//! 6. Rate limiting on `/admin/login` and order creation
//! 7. Admin gate on `/admin/api/*`

pub mod admin_auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use admin_auth::{RequireAdmin, clear_admin, require_admin, set_admin, verify_admin_secret};
pub use rate_limit::{login_rate_limiter, order_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
