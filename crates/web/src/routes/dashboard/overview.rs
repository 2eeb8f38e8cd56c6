//! Dashboard overview: headline totals and recent orders.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query as QueryParams, State},
    response::IntoResponse,
};
use bizgrow_core::Money;
use chrono::{Duration, Utc};
use tracing::instrument;

use super::orders::OrderRowView;
use super::{Merchant, Shell};
use crate::error::Result;
use crate::filters;
use crate::routes::{FlashQuery, Toast};
use crate::services::analytics::{format_delta, revenue_delta};
use crate::state::AppState;
use crate::supabase::{Order, Query, tables};

const COMPARISON_DAYS: i64 = 30;
const RECENT_ORDERS: usize = 5;

/// Overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/overview.html")]
pub struct OverviewTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub revenue: String,
    pub order_count: usize,
    pub product_count: u64,
    pub customer_count: u64,
    pub revenue_delta: String,
    pub delta_negative: bool,
    pub recent_orders: Vec<OrderRowView>,
}

/// Revenue of the last 30 days and of the 30 days before that.
fn compare_periods(orders: &[Order], now: chrono::DateTime<Utc>) -> (Money, Money) {
    let current_start = now - Duration::days(COMPARISON_DAYS);
    let previous_start = current_start - Duration::days(COMPARISON_DAYS);

    let mut current = Money::ZERO;
    let mut previous = Money::ZERO;
    for order in orders {
        if order.created_at >= current_start && order.created_at <= now {
            current += order.total_amount;
        } else if order.created_at >= previous_start && order.created_at < current_start {
            previous += order.total_amount;
        }
    }
    (current, previous)
}

/// Display the overview.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn overview(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(flash): QueryParams<FlashQuery>,
) -> Result<impl IntoResponse> {
    let client = state.supabase();
    let store_id = merchant.store.id;
    let by_store = Query::new().eq("store_id", store_id);

    let orders: Vec<Order> = client
        .select(
            merchant.caller(),
            tables::ORDERS,
            &by_store.clone().order("created_at", false),
        )
        .await?;
    let product_count = client
        .count(merchant.caller(), tables::PRODUCTS, &by_store)
        .await?;
    let customer_count = client
        .count(merchant.caller(), tables::CUSTOMERS, &by_store)
        .await?;

    let revenue: Money = orders.iter().map(|o| o.total_amount).sum();
    let (current, previous) = compare_periods(&orders, Utc::now());
    let delta = revenue_delta(current, previous);
    let offset = state.config().utc_offset;

    Ok(OverviewTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "overview"),
        revenue: revenue.to_string(),
        order_count: orders.len(),
        product_count,
        customer_count,
        revenue_delta: format_delta(delta),
        delta_negative: delta.is_some_and(|d| d.is_sign_negative() && !d.is_zero()),
        recent_orders: orders
            .iter()
            .take(RECENT_ORDERS)
            .map(|order| OrderRowView::new(order, offset))
            .collect(),
    })
}
