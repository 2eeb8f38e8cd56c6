//! Business logic that does not belong to a single route.
//!
//! # Services
//!
//! - `analytics` - Sales buckets, revenue deltas, top products
//! - `ai_upload` - Photo upload, product detection and review state machine
//! - `cart` - Per-store cart kept in the session
//! - `catalog` - Category and search filtering of product lists
//! - `csv_io` - Product, order and customer CSV export; product import
//! - `qr` - SVG QR codes for storefront links
//! - `whatsapp` - Click-to-chat links and message templates

pub mod ai_upload;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod csv_io;
pub mod qr;
pub mod whatsapp;
