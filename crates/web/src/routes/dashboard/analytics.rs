//! Sales analytics: chart, top products, status breakdown.
//!
//! The page and the JSON endpoint share one loader so the bars and the
//! JSON buckets always agree.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query as QueryParams, State},
    response::IntoResponse,
};
use bizgrow_core::Money;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Merchant, Shell};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::Toast;
use crate::services::analytics::{
    ChartBar, SalesBucket, SalesRange, aggregate, build_buckets, chart_bars, local_date,
    query_window, status_breakdown, top_products,
};
use crate::state::AppState;
use crate::supabase::{Order, Query, tables};

const TOP_PRODUCTS: usize = 5;

/// Chart height in SVG user units.
pub const CHART_HEIGHT: u32 = 200;

/// Range selector tab.
#[derive(Clone)]
pub struct RangeTab {
    pub value: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// One bar positioned for the SVG chart.
#[derive(Clone)]
pub struct BarView {
    pub label: String,
    pub total: String,
    pub count: u64,
    pub x: u32,
    pub y: u32,
    pub height: u32,
    /// Only some labels are drawn on wide ranges.
    pub show_label: bool,
}

/// Width of each bar slot in SVG user units.
const SLOT_WIDTH: u32 = 24;

fn position_bars(bars: Vec<ChartBar>) -> Vec<BarView> {
    let every = if bars.len() > 12 { 5 } else { 1 };
    bars.into_iter()
        .enumerate()
        .map(|(index, bar)| {
            let height = bar.height_pct * CHART_HEIGHT / 100;
            #[allow(clippy::cast_possible_truncation)]
            let x = index as u32 * SLOT_WIDTH;
            BarView {
                label: bar.label,
                total: bar.total,
                count: bar.count,
                x,
                y: CHART_HEIGHT - height,
                height,
                show_label: index % every == 0,
            }
        })
        .collect()
}

/// Top product row.
#[derive(Clone)]
pub struct TopProductView {
    pub name: String,
    pub quantity: u64,
    pub revenue: String,
}

/// Status breakdown row.
#[derive(Clone)]
pub struct StatusCountView {
    pub label: &'static str,
    pub status: &'static str,
    pub count: u64,
}

/// Analytics page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/analytics.html")]
pub struct AnalyticsTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub ranges: Vec<RangeTab>,
    pub range: &'static str,
    pub bars: Vec<BarView>,
    pub chart_width: u32,
    pub chart_height: u32,
    pub total: String,
    pub order_count: u64,
    pub top_products: Vec<TopProductView>,
    pub statuses: Vec<StatusCountView>,
}

/// Query parameters of both analytics endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

/// JSON body of `/dashboard/analytics/sales.json`.
#[derive(Debug, Serialize)]
pub struct SalesResponse {
    pub range: SalesRange,
    pub buckets: Vec<SalesBucket>,
    pub total: Money,
    pub count: u64,
}

/// Orders in the range, aggregated.
struct RangeReport {
    range: SalesRange,
    buckets: Vec<SalesBucket>,
    orders: Vec<Order>,
}

async fn load_report(state: &AppState, merchant: &Merchant, range: SalesRange) -> Result<RangeReport> {
    let offset = state.config().utc_offset;
    let today = local_date(Utc::now(), offset);
    let buckets = build_buckets(range, today);
    let (start, end) = query_window(&buckets, offset)
        .ok_or_else(|| AppError::Internal(format!("no window for range {}", range.as_str())))?;

    let orders: Vec<Order> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::ORDERS,
            &Query::new()
                .eq("store_id", merchant.store.id)
                .gte("created_at", start.to_rfc3339())
                .lt("created_at", end.to_rfc3339())
                .order("created_at", true),
        )
        .await?;

    Ok(RangeReport {
        range,
        buckets: aggregate(buckets, &orders, offset),
        orders,
    })
}

/// Display the analytics page.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn page(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(query): QueryParams<RangeQuery>,
) -> Result<impl IntoResponse> {
    let range = SalesRange::parse(query.range.as_deref());
    let report = load_report(&state, &merchant, range).await?;

    let total: Money = report.buckets.iter().map(|b| b.total).sum();
    let order_count = report.buckets.iter().map(|b| b.count).sum();
    let bars = position_bars(chart_bars(&report.buckets));
    #[allow(clippy::cast_possible_truncation)]
    let chart_width = bars.len() as u32 * SLOT_WIDTH;

    Ok(AnalyticsTemplate {
        toast: None,
        shell: merchant.shell(&state, "analytics"),
        ranges: SalesRange::ALL
            .into_iter()
            .map(|r| RangeTab {
                value: r.as_str(),
                label: r.label(),
                active: r == report.range,
            })
            .collect(),
        range: report.range.as_str(),
        bars,
        chart_width,
        chart_height: CHART_HEIGHT,
        total: total.to_string(),
        order_count,
        top_products: top_products(&report.orders, TOP_PRODUCTS)
            .into_iter()
            .map(|p| TopProductView {
                name: p.name,
                quantity: p.quantity,
                revenue: p.revenue.to_string(),
            })
            .collect(),
        statuses: status_breakdown(&report.orders)
            .into_iter()
            .map(|(status, count)| StatusCountView {
                label: status.label(),
                status: status.as_str(),
                count,
            })
            .collect(),
    })
}

/// Chart buckets as JSON.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn sales_json(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(query): QueryParams<RangeQuery>,
) -> Result<Json<SalesResponse>> {
    let range = SalesRange::parse(query.range.as_deref());
    let report = load_report(&state, &merchant, range).await?;
    Ok(Json(SalesResponse {
        range: report.range,
        total: report.buckets.iter().map(|b| b.total).sum(),
        count: report.buckets.iter().map(|b| b.count).sum(),
        buckets: report.buckets,
    }))
}
