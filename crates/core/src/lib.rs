//! BizGrow Core - Shared domain types.
//!
//! Used by every BizGrow 360 component:
//! - `web` - Marketing site, storefronts, merchant dashboard and admin console
//! - `cli` - Command-line tools for session migrations, CSV import/export and QR codes
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Business data
//! lives behind the hosted backend; these types describe its rows.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, emails, order and payment statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
