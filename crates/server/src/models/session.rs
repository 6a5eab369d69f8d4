//! Session-stored state.
//!
//! The visitor's cart ([`shoply_core::cart::Cart`]) and the admin flag live
//! in the tower-sessions `PostgreSQL` store.

/// Session keys.
pub mod keys {
    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for the admin flag set by a successful `/admin/login`.
    pub const IS_ADMIN: &str = "is_admin";
}
