//! Storefront checkout and order confirmation.
//!
//! Checkout hands the order to the backend as the anonymous role:
//!
//! 1. find or create the customer by store and phone,
//! 2. insert the order with its line items and total,
//! 3. bump the customer's order count and lifetime spend,
//! 4. clear the cart and redirect to the confirmation page.
//!
//! The backend's policies decide what anonymous visitors may write.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use bizgrow_core::{Money, OrderId, OrderStatus, PaymentMethod, StoreId};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use super::{StoreView, load_cart};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::{Toast, non_empty, redirect_error};
use crate::services::cart::{Cart, PricedCart, session_key};
use crate::services::whatsapp::{chat_link, normalize_phone, order_placed_message};
use crate::state::AppState;
use crate::supabase::{
    Caller, Customer, CustomerInput, NewOrder, Order, Query, SupabaseError, tables,
};

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "storefront/confirmation.html")]
pub struct ConfirmationTemplate {
    pub toast: Option<Toast>,
    pub store: StoreView,
    pub cart_count: u32,
    pub reference: String,
    pub customer_name: String,
    pub status: &'static str,
    pub payment_method: &'static str,
    pub lines: Vec<OrderLineView>,
    pub total: String,
    pub whatsapp_link: Option<String>,
}

/// Place an order from the session cart.
#[instrument(skip(state, session, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    Path(store_id): Path<StoreId>,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let cart_path = format!("/store/{store_id}/cart");

    let Some(details) = CustomerDetails::from_form(
        &form.customer_name,
        &form.customer_phone,
        form.customer_address,
    ) else {
        return redirect_error(&cart_path, "checkout_details").into_response();
    };

    let cart = load_cart(&session, store_id).await;
    if cart.is_empty() {
        return redirect_error(&cart_path, "cart_empty").into_response();
    }

    let priced = match state.supabase().public_products(store_id).await {
        Ok(products) => cart.price(&products),
        Err(e) => {
            warn!(error = %e, "Failed to price cart at checkout");
            return redirect_error(&cart_path, "checkout_failed").into_response();
        }
    };
    if !priced.unavailable.is_empty() {
        // Send the visitor back so the cart page drops the lines and says so.
        return Redirect::to(&cart_path).into_response();
    }

    let notes = non_empty(form.notes);
    match submit_order(&state, store_id, &details, priced, form.payment_method, notes).await {
        Ok(order_id) => {
            if let Err(e) = session.remove::<Cart>(&session_key(store_id)).await {
                warn!(error = %e, "Failed to clear cart after checkout");
            }
            info!(%order_id, "Order placed");
            Redirect::to(&format!("/order-confirmation/{order_id}")).into_response()
        }
        Err(e) => {
            error!(error = %e, "Checkout failed");
            redirect_error(&cart_path, "checkout_failed").into_response()
        }
    }
}

#[derive(Debug)]
struct CustomerDetails {
    name: String,
    /// Normalised digits, so one person maps to one customer row.
    phone: String,
    address: Option<String>,
}

impl CustomerDetails {
    /// `None` when the name is blank or the phone is unusable.
    fn from_form(name: &str, phone: &str, address: Option<String>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            phone: normalize_phone(phone)?,
            address: non_empty(address),
        })
    }
}

async fn submit_order(
    state: &AppState,
    store_id: StoreId,
    details: &CustomerDetails,
    priced: PricedCart,
    payment_method: PaymentMethod,
    notes: Option<String>,
) -> std::result::Result<OrderId, SupabaseError> {
    let client = state.supabase();
    let customer = find_or_create_customer(state, store_id, details).await?;

    let order = NewOrder {
        store_id,
        customer_id: Some(customer.id),
        customer_name: details.name.clone(),
        customer_phone: details.phone.clone(),
        customer_address: details.address.clone(),
        items: priced.items,
        total_amount: priced.total,
        status: OrderStatus::Pending,
        payment_method,
        notes,
    };
    let created: Vec<Order> = client.insert(Caller::Anon, tables::ORDERS, &order).await?;
    let order = created
        .into_iter()
        .next()
        .ok_or_else(|| SupabaseError::Parse("order insert returned no row".to_string()))?;

    let totals = json!({
        "total_orders": customer.total_orders + 1,
        "total_spent": customer.total_spent + order.total_amount,
    });
    let updated: std::result::Result<Vec<Customer>, _> = client
        .update(
            Caller::Anon,
            tables::CUSTOMERS,
            &Query::new().eq("id", customer.id),
            &totals,
        )
        .await;
    if let Err(e) = updated {
        // The order stands; only the customer summary is stale.
        warn!(customer_id = %customer.id, error = %e, "Failed to update customer totals");
    }

    Ok(order.id)
}

async fn find_or_create_customer(
    state: &AppState,
    store_id: StoreId,
    details: &CustomerDetails,
) -> std::result::Result<Customer, SupabaseError> {
    let client = state.supabase();
    let existing: Option<Customer> = client
        .select_one(
            Caller::Anon,
            tables::CUSTOMERS,
            Query::new()
                .eq("store_id", store_id)
                .eq("phone", &details.phone),
        )
        .await?;
    if let Some(customer) = existing {
        return Ok(customer);
    }

    let input = CustomerInput {
        store_id,
        name: details.name.clone(),
        phone: details.phone.clone(),
        address: details.address.clone(),
        total_orders: 0,
        total_spent: Money::ZERO,
    };
    let created: Vec<Customer> = client.insert(Caller::Anon, tables::CUSTOMERS, &input).await?;
    created
        .into_iter()
        .next()
        .ok_or_else(|| SupabaseError::Parse("customer insert returned no row".to_string()))
}

/// Display the order summary after checkout.
///
/// # Errors
///
/// Returns 404 if the order or its store does not exist.
#[instrument(skip(state, session))]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order: Order = state
        .supabase()
        .select_one(Caller::Anon, tables::ORDERS, Query::new().eq("id", order_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    let store = state.supabase().public_store(order.store_id).await?;

    let reference = order.reference();
    let whatsapp_link = store.whatsapp_number.as_deref().and_then(|number| {
        chat_link(
            number,
            &order_placed_message(&store.name, &reference, order.total_amount),
        )
    });

    Ok(ConfirmationTemplate {
        toast: None,
        cart_count: load_cart(&session, store.id).await.item_count(),
        store: StoreView::from(&store),
        reference,
        customer_name: order.customer_name.clone(),
        status: order.status.label(),
        payment_method: order.payment_method.label(),
        lines: order
            .items
            .iter()
            .map(|item| OrderLineView {
                name: item.name.clone(),
                quantity: item.quantity,
                line_total: item.line_total().to_string(),
            })
            .collect(),
        total: order.total_amount.to_string(),
        whatsapp_link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_details_normalise_phone() {
        let spaced = CustomerDetails::from_form(" Asha ", "98765 43210", None);
        let plain = CustomerDetails::from_form("Asha", "9876543210", Some("  ".to_string()));
        let (Some(spaced), Some(plain)) = (spaced, plain) else {
            panic!("valid details rejected");
        };
        assert_eq!(spaced.name, "Asha");
        assert_eq!(spaced.phone, "919876543210");
        assert_eq!(spaced.phone, plain.phone);
        assert_eq!(plain.address, None);
    }

    #[test]
    fn test_customer_details_rejects_blank_name_or_short_phone() {
        assert!(CustomerDetails::from_form("  ", "9876543210", None).is_none());
        assert!(CustomerDetails::from_form("Asha", "12345", None).is_none());
    }
}
