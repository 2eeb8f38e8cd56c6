//! Storefront cart route handlers.
//!
//! The session holds product IDs and quantities per store. Every render
//! re-prices the cart against the live catalogue, and lines whose product
//! has been hidden or deleted are dropped with a notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bizgrow_core::{PaymentMethod, ProductId, StoreId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use super::{StoreView, load_cart};
use crate::error::Result;
use crate::filters;
use crate::routes::{FlashQuery, Toast, message_for, redirect_error, redirect_success};
use crate::services::cart::{Cart, MAX_QUANTITY, session_key};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Payment option on the checkout form.
#[derive(Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

fn payment_options() -> Vec<PaymentOption> {
    PaymentMethod::ALL
        .iter()
        .map(|method| PaymentOption {
            value: method.as_str(),
            label: method.label(),
            checked: *method == PaymentMethod::default(),
        })
        .collect()
}

/// Cart page template, including the checkout form.
#[derive(Template, WebTemplate)]
#[template(path = "storefront/cart.html")]
pub struct CartTemplate {
    pub toast: Option<Toast>,
    pub store: StoreView,
    pub cart_count: u32,
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub max_quantity: u32,
    pub payment_options: Vec<PaymentOption>,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub product_id: ProductId,
}

pub(crate) async fn save_cart(
    session: &Session,
    store_id: StoreId,
    cart: &Cart,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session.insert(&session_key(store_id), cart).await
}

fn cart_path(store_id: StoreId) -> String {
    format!("/store/{store_id}/cart")
}

/// Display the cart and checkout form.
///
/// # Errors
///
/// Returns 404 if the store does not exist, or 502 if the backend fails.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(store_id): Path<StoreId>,
    Query(flash): Query<FlashQuery>,
) -> Result<impl IntoResponse> {
    let store = state.supabase().public_store(store_id).await?;
    let products = state.supabase().public_products(store_id).await?;
    let mut cart = load_cart(&session, store_id).await;
    let priced = cart.price(&products);

    let mut toast = flash.toast();
    if !priced.unavailable.is_empty() {
        debug!(count = priced.unavailable.len(), "Dropping unavailable cart lines");
        for product_id in &priced.unavailable {
            cart.remove(*product_id);
        }
        save_cart(&session, store_id, &cart).await?;
        toast = Some(Toast::error(message_for("unavailable")));
    }

    let lines = priced
        .items
        .iter()
        .map(|item| CartLineView {
            product_id: item.product_id,
            name: item.name.clone(),
            price: item.price.to_string(),
            quantity: item.quantity,
            line_total: item.line_total().to_string(),
        })
        .collect();

    Ok(CartTemplate {
        toast,
        store: StoreView::from(&store),
        cart_count: cart.item_count(),
        lines,
        total: priced.total.to_string(),
        max_quantity: MAX_QUANTITY,
        payment_options: payment_options(),
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(store_id): Path<StoreId>,
    Form(form): Form<AddForm>,
) -> Response {
    let product_path = format!("/store/{store_id}/products/{}", form.product_id);

    // Only accept products that are on sale in this store.
    let on_sale = match state.supabase().public_products(store_id).await {
        Ok(products) => products.iter().any(|p| p.id == form.product_id),
        Err(e) => {
            warn!(error = %e, "Failed to load catalogue for add to cart");
            false
        }
    };
    if !on_sale {
        return redirect_error(&format!("/store/{store_id}"), "unavailable").into_response();
    }

    let mut cart = load_cart(&session, store_id).await;
    cart.add(form.product_id, form.quantity.unwrap_or(1));
    if let Err(e) = save_cart(&session, store_id, &cart).await {
        warn!(error = %e, "Failed to save cart");
        return redirect_error(&product_path, "cart_failed").into_response();
    }

    redirect_success(&product_path, "added_to_cart").into_response()
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Path(store_id): Path<StoreId>,
    Form(form): Form<UpdateForm>,
) -> Result<Redirect> {
    let mut cart = load_cart(&session, store_id).await;
    cart.set(form.product_id, form.quantity);
    save_cart(&session, store_id, &cart).await?;
    Ok(redirect_success(&cart_path(store_id), "cart_updated"))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Path(store_id): Path<StoreId>,
    Form(form): Form<RemoveForm>,
) -> Result<Redirect> {
    let mut cart = load_cart(&session, store_id).await;
    cart.remove(form.product_id);
    save_cart(&session, store_id, &cart).await?;
    Ok(redirect_success(&cart_path(store_id), "cart_updated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_on_delivery_is_preselected() {
        let options = payment_options();
        assert_eq!(options.len(), 4);
        let checked: Vec<&str> = options
            .iter()
            .filter(|o| o.checked)
            .map(|o| o.value)
            .collect();
        assert_eq!(checked, vec!["cash_on_delivery"]);
    }
}
