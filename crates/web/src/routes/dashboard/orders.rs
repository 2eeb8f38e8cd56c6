//! Order management: list, detail, status changes, invoice, CSV.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query as QueryParams, State},
    response::{IntoResponse, Redirect, Response},
};
use bizgrow_core::{OrderId, OrderStatus, StoreId};
use chrono::FixedOffset;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{Merchant, Shell, csv_download};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::{FlashQuery, Toast, redirect_error, redirect_success};
use crate::routes::storefront::checkout::OrderLineView;
use crate::services::csv_io;
use crate::state::AppState;
use crate::supabase::{Order, Query, StatusChange, tables};

/// Order row for lists.
#[derive(Clone)]
pub struct OrderRowView {
    pub id: OrderId,
    pub reference: String,
    pub customer_name: String,
    pub total: String,
    pub status_label: &'static str,
    /// Status value, used as a badge CSS modifier.
    pub status: &'static str,
    pub created: String,
    pub item_count: u32,
}

impl OrderRowView {
    #[must_use]
    pub fn new(order: &Order, offset: FixedOffset) -> Self {
        Self {
            id: order.id,
            reference: order.reference(),
            customer_name: order.customer_name.clone(),
            total: order.total_amount.to_string(),
            status_label: order.status.label(),
            status: order.status.as_str(),
            created: format_local(order, offset),
            item_count: order.item_count(),
        }
    }
}

fn format_local(order: &Order, offset: FixedOffset) -> String {
    order
        .created_at
        .with_timezone(&offset)
        .format("%-d %b %Y, %H:%M")
        .to_string()
}

/// Status filter tab.
#[derive(Clone)]
pub struct StatusTab {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

fn status_tabs(selected: Option<OrderStatus>) -> Vec<StatusTab> {
    let mut tabs = vec![StatusTab {
        label: "All",
        href: "/dashboard/orders".to_string(),
        active: selected.is_none(),
    }];
    tabs.extend(OrderStatus::ALL.iter().map(|status| StatusTab {
        label: status.label(),
        href: format!("/dashboard/orders?status={status}"),
        active: selected == Some(*status),
    }));
    tabs
}

/// Status change offered on the detail page.
#[derive(Clone)]
pub struct TransitionView {
    pub value: &'static str,
    pub label: &'static str,
    pub destructive: bool,
}

/// Statuses an order may move to from `current`.
#[must_use]
pub fn allowed_transitions(current: OrderStatus) -> Vec<TransitionView> {
    OrderStatus::ALL
        .into_iter()
        .filter(|target| current.can_transition_to(*target))
        .map(|target| TransitionView {
            value: target.as_str(),
            label: target.label(),
            destructive: target == OrderStatus::Cancelled,
        })
        .collect()
}

/// Full order details shared by the detail page and the invoice.
#[derive(Clone)]
pub struct OrderDetailView {
    pub id: OrderId,
    pub reference: String,
    pub created: String,
    pub status_label: &'static str,
    pub status: &'static str,
    pub payment_method: &'static str,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineView>,
    pub total: String,
}

impl OrderDetailView {
    fn new(order: &Order, offset: FixedOffset) -> Self {
        Self {
            id: order.id,
            reference: order.reference(),
            created: format_local(order, offset),
            status_label: order.status.label(),
            status: order.status.as_str(),
            payment_method: order.payment_method.label(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_address: order.customer_address.clone(),
            notes: order.notes.clone(),
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
        }
    }
}

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/orders/index.html")]
pub struct OrdersTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub tabs: Vec<StatusTab>,
    pub orders: Vec<OrderRowView>,
    pub search: String,
    /// Selected status, kept when searching.
    pub status: String,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/orders/show.html")]
pub struct OrderTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub order: OrderDetailView,
    pub transitions: Vec<TransitionView>,
}

/// Printable invoice. Standalone page without the dashboard chrome.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/orders/invoice.html")]
pub struct InvoiceTemplate {
    pub store_name: String,
    pub store_address: Option<String>,
    pub store_phone: Option<String>,
    pub order: OrderDetailView,
}

/// Query parameters of the order list.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    /// Customer name search.
    pub q: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Status update form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

async fn load_order(state: &AppState, merchant: &Merchant, id: OrderId) -> Result<Order> {
    state
        .supabase()
        .select_one(
            merchant.caller(),
            tables::ORDERS,
            Query::new().eq("id", id).eq("store_id", merchant.store.id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Display orders, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn index(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(query): QueryParams<OrderListQuery>,
) -> Result<impl IntoResponse> {
    let selected = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let search = query.q.as_deref().map(str::trim).unwrap_or_default().to_string();
    let orders: Vec<Order> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::ORDERS,
            &order_filter(merchant.store.id, selected, &search),
        )
        .await?;

    let offset = state.config().utc_offset;
    let flash = FlashQuery {
        error: query.error,
        success: query.success,
    };
    Ok(OrdersTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "orders"),
        tabs: status_tabs(selected),
        orders: orders
            .iter()
            .map(|order| OrderRowView::new(order, offset))
            .collect(),
        search,
        status: selected.map(|s| s.as_str().to_string()).unwrap_or_default(),
    })
}

/// Orders of `store_id`, newest first, by status and customer name.
fn order_filter(store_id: StoreId, status: Option<OrderStatus>, search: &str) -> Query {
    let mut filter = Query::new().eq("store_id", store_id);
    if let Some(status) = status {
        filter = filter.eq("status", status);
    }
    if !search.is_empty() {
        filter = filter.ilike("customer_name", search);
    }
    filter.order("created_at", false)
}

/// Display one order with its allowed status changes.
///
/// # Errors
///
/// Returns 404 if the order is not in the merchant's store.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn show(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<OrderId>,
    QueryParams(flash): QueryParams<FlashQuery>,
) -> Result<impl IntoResponse> {
    let order = load_order(&state, &merchant, id).await?;
    Ok(OrderTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "orders"),
        transitions: allowed_transitions(order.status),
        order: OrderDetailView::new(&order, state.config().utc_offset),
    })
}

/// Move an order to a new status. Transitions the lifecycle does not allow
/// are refused without calling the backend.
///
/// # Errors
///
/// Returns 404 if the order is not in the merchant's store.
#[instrument(skip(state, merchant, form), fields(store_id = %merchant.store.id))]
pub async fn update_status(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let back = format!("/dashboard/orders/{id}");
    let Ok(target) = form.status.parse::<OrderStatus>() else {
        return Ok(redirect_error(&back, "invalid_transition"));
    };
    let order = load_order(&state, &merchant, id).await?;
    Ok(change_status(&state, &merchant, &order, target, &back).await)
}

/// Apply a validated status change and redirect to `back`.
pub(crate) async fn change_status(
    state: &AppState,
    merchant: &Merchant,
    order: &Order,
    target: OrderStatus,
    back: &str,
) -> Redirect {
    if !order.status.can_transition_to(target) {
        info!(order_id = %order.id, from = %order.status, to = %target, "Refused status change");
        return redirect_error(back, "invalid_transition");
    }

    let updated: std::result::Result<Vec<Order>, _> = state
        .supabase()
        .update(
            merchant.caller(),
            tables::ORDERS,
            &Query::new()
                .eq("id", order.id)
                .eq("store_id", merchant.store.id),
            &StatusChange { status: target },
        )
        .await;
    match updated {
        Ok(_) => {
            info!(order_id = %order.id, from = %order.status, to = %target, "Order status changed");
            redirect_success(back, "status_updated")
        }
        Err(e) => {
            warn!(order_id = %order.id, error = %e, "Order status update failed");
            redirect_error(back, "status_failed")
        }
    }
}

/// Printable invoice.
///
/// # Errors
///
/// Returns 404 if the order is not in the merchant's store.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn invoice(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = load_order(&state, &merchant, id).await?;
    Ok(InvoiceTemplate {
        store_name: merchant.store.name.clone(),
        store_address: merchant.store.address.clone(),
        store_phone: merchant.store.whatsapp_number.clone(),
        order: OrderDetailView::new(&order, state.config().utc_offset),
    })
}

/// Download all orders as CSV.
///
/// # Errors
///
/// Returns an error if the backend or CSV writer fails.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn export_csv(State(state): State<AppState>, merchant: Merchant) -> Result<Response> {
    let orders: Vec<Order> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::ORDERS,
            &Query::new()
                .eq("store_id", merchant.store.id)
                .order("created_at", false),
        )
        .await?;
    let bytes = csv_io::export_orders(&orders, state.config().utc_offset)?;
    Ok(csv_download("orders.csv", bytes))
}
