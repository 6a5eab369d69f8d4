//! Shoply Core - Shared types and domain rules.
//!
//! This crate provides the types and the small pieces of business logic used by
//! every Shoply component:
//! - `server` - Storefront JSON API and admin back-office
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Callers load rows, ask core what should change, and write
//! the result back inside their own transaction.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, slugs, money and statuses
//! - [`catalog`] - Sibling ordering and parent-cycle checks for categories
//! - [`cart`] - Shopping cart lines and derived totals
//! - [`order_flow`] - Order status transitions and history entries
//! - [`invoice`] - Invoice numbering, due dates, VAT and payment QR payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod invoice;
pub mod order_flow;
pub mod types;

pub use types::*;
