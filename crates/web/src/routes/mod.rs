//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Marketing
//! GET  /                                  - Landing page
//! GET  /solutions, /solutions/{slug}      - Solutions (markdown content)
//! GET  /features, /features/{slug}        - Features (markdown content)
//! GET  /pricing, /about, /contact         - Static pages (markdown content)
//!
//! # Auth
//! GET  /auth?mode=login|signup            - Auth form (signed-in users go to /dashboard)
//! POST /auth/login                        - Password sign-in (rate limited)
//! POST /auth/signup                       - Account creation (rate limited)
//! POST /auth/logout                       - Sign out
//!
//! # Storefront
//! GET  /store/{store_id}                  - Catalogue (?category=&q=)
//! GET  /store/{store_id}/products/{id}    - Product detail
//! GET  /store/{store_id}/cart             - Cart and checkout form
//! POST /store/{store_id}/cart/add         - Add to cart
//! POST /store/{store_id}/cart/update      - Set quantity (0 removes)
//! POST /store/{store_id}/cart/remove      - Remove line
//! POST /store/{store_id}/cart/checkout    - Place order (rate limited)
//! GET  /order-confirmation/{order_id}     - Order summary
//!
//! # Merchant dashboard (requires sign-in)
//! GET  /dashboard                         - Overview
//! ...  /dashboard/products                - Catalogue management, bulk actions, CSV
//! ...  /dashboard/orders                  - Orders, status updates, invoices, CSV
//! ...  /dashboard/customers               - Customers, CSV
//! GET  /dashboard/analytics               - Sales chart (?range=week|month|year)
//! GET  /dashboard/analytics/sales.json    - Chart buckets as JSON
//! ...  /dashboard/delivery                - Delivery board
//! ...  /dashboard/whatsapp                - Click-to-chat messages
//! ...  /dashboard/ai-upload               - Photo detection and review
//! ...  /dashboard/settings                - Store profile, logo, QR code
//!
//! # Admin console (requires an admin_users row)
//! GET  /admin, /admin/stores, /admin/merchants
//! ```

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod home;
pub mod pages;
pub mod storefront;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::{auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

// =============================================================================
// Flash messages
// =============================================================================

/// `?error=` / `?success=` codes carried across a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl FlashQuery {
    /// Toast for the page, errors first.
    #[must_use]
    pub fn toast(&self) -> Option<Toast> {
        self.error
            .as_deref()
            .map(|code| Toast::error(message_for(code)))
            .or_else(|| {
                self.success
                    .as_deref()
                    .map(|code| Toast::success(message_for(code)))
            })
    }
}

/// A transient notice rendered at the top of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// `error` or `success`, used as a CSS modifier.
    pub kind: &'static str,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }
}

/// Human text for a flash code. Unknown codes get a generic message.
#[must_use]
pub fn message_for(code: &str) -> &'static str {
    match code {
        // auth
        "invalid_credentials" => "Invalid email or password.",
        "signin_failed" => "Could not sign you in. Please try again.",
        "signup_failed" => "Could not create your account. Please try again.",
        "password_mismatch" => "Passwords do not match.",
        "password_too_short" => "Passwords must be at least 8 characters.",
        "invalid_email" => "Please enter a valid email address.",
        "check_email" => "Account created. Check your email to confirm it, then sign in.",
        "signed_out" => "You have been signed out.",
        // store
        "store_required" => "Create your store to get started.",
        "store_saved" => "Store settings saved.",
        "store_failed" => "Could not save store settings.",
        "name_required" => "A name is required.",
        "logo_saved" => "Logo updated.",
        "logo_failed" => "Could not upload the logo.",
        // products
        "product_saved" => "Product saved.",
        "product_deleted" => "Product deleted.",
        "product_failed" => "Could not save the product.",
        "invalid_price" => "Please enter a valid price.",
        "invalid_stock" => "Stock must be a whole number.",
        "image_failed" => "Could not upload the image.",
        "invalid_phone" => "Please enter a valid phone number.",
        "message_required" => "Type a message first.",
        "nothing_selected" => "Select at least one item first.",
        "bulk_enabled" => "Selected products are now visible.",
        "bulk_disabled" => "Selected products are now hidden.",
        "bulk_deleted" => "Selected products deleted.",
        "bulk_failed" => "Could not update the selected products.",
        "import_done" => "Products imported.",
        "import_failed" => "Could not import that file.",
        // orders
        "status_updated" => "Order status updated.",
        "invalid_transition" => "That status change is not allowed.",
        "status_failed" => "Could not update the order.",
        // storefront
        "added_to_cart" => "Added to cart.",
        "cart_updated" => "Cart updated.",
        "cart_failed" => "Could not update your cart.",
        "cart_empty" => "Your cart is empty.",
        "checkout_details" => "Please enter your name and phone number.",
        "checkout_failed" => "Could not place your order. Please try again.",
        "unavailable" => "Some items are no longer available and were removed.",
        // AI upload
        "no_images" => "Choose at least one photo.",
        "too_many_files" => "You can upload up to 10 photos at a time.",
        "unsupported_type" => "Photos must be JPEG, PNG or WebP.",
        "too_large" => "Each photo must be 5 MB or smaller.",
        "detection_failed" => "Product detection failed. Please try again.",
        "ai_saved" => "Products added to your catalogue.",
        "ai_discarded" => "Results discarded.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Redirect to `path` with a flash code.
#[must_use]
pub fn redirect_with(path: &str, kind: &str, code: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{path}{separator}{kind}={code}"))
}

/// Redirect with `?error=code`.
#[must_use]
pub fn redirect_error(path: &str, code: &str) -> Redirect {
    redirect_with(path, "error", code)
}

/// Redirect with `?success=code`.
#[must_use]
pub fn redirect_success(path: &str, code: &str) -> Redirect {
    redirect_with(path, "success", code)
}

/// Treat a blank form field as absent.
#[must_use]
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Routers
// =============================================================================

fn marketing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/solutions", get(pages::solutions_index))
        .route("/solutions/{slug}", get(pages::solution))
        .route("/features", get(pages::features_index))
        .route("/features/{slug}", get(pages::feature))
        .route("/pricing", get(pages::pricing))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", get(auth::auth_page))
        .route("/auth/login", post(auth::login).layer(auth_rate_limiter()))
        .route("/auth/signup", post(auth::signup).layer(auth_rate_limiter()))
        .route("/auth/logout", post(auth::logout))
}

fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/store/{store_id}", get(storefront::catalogue))
        .route(
            "/store/{store_id}/products/{product_id}",
            get(storefront::product),
        )
        .route("/store/{store_id}/cart", get(storefront::cart::show))
        .route("/store/{store_id}/cart/add", post(storefront::cart::add))
        .route(
            "/store/{store_id}/cart/update",
            post(storefront::cart::update),
        )
        .route(
            "/store/{store_id}/cart/remove",
            post(storefront::cart::remove),
        )
        .route(
            "/store/{store_id}/cart/checkout",
            post(storefront::checkout::place_order).layer(checkout_rate_limiter()),
        )
        .route(
            "/order-confirmation/{order_id}",
            get(storefront::checkout::confirmation),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::overview))
        .route("/admin/stores", get(admin::stores))
        .route("/admin/merchants", get(admin::merchants))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(marketing_routes())
        .merge(auth_routes())
        .merge(storefront_routes())
        .nest("/dashboard", dashboard::routes())
        .merge(admin_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_prefers_error() {
        let query = FlashQuery {
            error: Some("invalid_credentials".to_string()),
            success: Some("signed_out".to_string()),
        };
        assert_eq!(
            query.toast(),
            Some(Toast::error("Invalid email or password."))
        );
    }

    #[test]
    fn test_unknown_code_gets_generic_message() {
        let query = FlashQuery {
            error: Some("<script>".to_string()),
            success: None,
        };
        assert_eq!(
            query.toast().map(|t| t.message),
            Some("Something went wrong. Please try again.".to_string())
        );
    }

    #[test]
    fn test_redirect_with_appends_to_existing_query() {
        use axum::response::IntoResponse;

        let response = redirect_error("/auth?mode=login", "invalid_credentials").into_response();
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/auth?mode=login&error=invalid_credentials"
        );
    }
}
