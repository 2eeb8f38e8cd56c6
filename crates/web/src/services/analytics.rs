//! Sales aggregation for the analytics chart and dashboard overview.
//!
//! Orders are grouped by the calendar day (or month) they were placed on in
//! the store's local offset. Buckets sum `total_amount` and count orders; no
//! status filtering is applied.

use std::collections::HashMap;

use bizgrow_core::{Money, OrderStatus, ProductId};
use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::supabase::Order;

/// Chart time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesRange {
    /// Seven daily buckets ending today.
    #[default]
    Week,
    /// Thirty daily buckets ending today.
    Month,
    /// Twelve monthly buckets ending this month.
    Year,
}

impl SalesRange {
    /// All ranges, in tab order.
    pub const ALL: [Self; 3] = [Self::Week, Self::Month, Self::Year];

    /// Parse a query-string value; anything unknown falls back to `Week`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("month") => Self::Month,
            Some("year") => Self::Year,
            _ => Self::Week,
        }
    }

    /// Query-string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Tab label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Week => "Last 7 days",
            Self::Month => "Last 30 days",
            Self::Year => "Last 12 months",
        }
    }
}

/// One bar of the sales chart. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesBucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total: Money,
    pub count: u64,
}

impl SalesBucket {
    fn empty(label: String, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label,
            start,
            end,
            total: Money::ZERO,
            count: 0,
        }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Build empty buckets for `range` ending on `today` (store-local date).
#[must_use]
pub fn build_buckets(range: SalesRange, today: NaiveDate) -> Vec<SalesBucket> {
    match range {
        SalesRange::Week => daily_buckets(today, 7, "%a"),
        SalesRange::Month => daily_buckets(today, 30, "%-d %b"),
        SalesRange::Year => monthly_buckets(today, 12),
    }
}

fn daily_buckets(today: NaiveDate, days: u64, label_format: &str) -> Vec<SalesBucket> {
    (0..days)
        .rev()
        .filter_map(|back| {
            let start = today.checked_sub_days(Days::new(back))?;
            let end = start.succ_opt()?;
            Some(SalesBucket::empty(
                start.format(label_format).to_string(),
                start,
                end,
            ))
        })
        .collect()
}

fn monthly_buckets(today: NaiveDate, months: u32) -> Vec<SalesBucket> {
    let Some(this_month) = today.with_day(1) else {
        return Vec::new();
    };
    (0..months)
        .rev()
        .filter_map(|back| {
            let start = this_month.checked_sub_months(Months::new(back))?;
            let end = start.checked_add_months(Months::new(1))?;
            Some(SalesBucket::empty(start.format("%b").to_string(), start, end))
        })
        .collect()
}

/// UTC instants covering `buckets`, for the `created_at` filter of the orders query.
#[must_use]
pub fn query_window(
    buckets: &[SalesBucket],
    offset: FixedOffset,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = buckets.first()?;
    let last = buckets.last()?;
    Some((
        local_midnight(first.start, offset)?,
        local_midnight(last.end, offset)?,
    ))
}

/// UTC instant of local midnight at the start of `date`.
#[must_use]
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Store-local date of an instant.
#[must_use]
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Sum and count `orders` into `buckets`. Orders outside every bucket are ignored.
#[must_use]
pub fn aggregate(
    mut buckets: Vec<SalesBucket>,
    orders: &[Order],
    offset: FixedOffset,
) -> Vec<SalesBucket> {
    for order in orders {
        let date = local_date(order.created_at, offset);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.contains(date)) {
            bucket.total += order.total_amount;
            bucket.count += 1;
        }
    }
    buckets
}

/// Percentage change from `previous` to `current`, rounded to one decimal.
///
/// `None` when there is no previous revenue to compare against, or the
/// change is out of decimal range.
#[must_use]
pub fn revenue_delta(current: Money, previous: Money) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    let change = current
        .amount()
        .checked_sub(previous.amount())?
        .checked_div(previous.amount())?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(change.round_dp(1))
}

/// Display form of a delta: `+12.5%`, `-3.0%`, or `n/a`.
#[must_use]
pub fn format_delta(delta: Option<Decimal>) -> String {
    match delta {
        Some(d) if d.is_sign_negative() && !d.is_zero() => format!("{d:.1}%"),
        Some(d) => format!("+{d:.1}%"),
        None => "n/a".to_string(),
    }
}

/// Best-selling product by units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u64,
    pub revenue: Money,
}

/// Top `limit` products by quantity across order lines; ties broken by name.
#[must_use]
pub fn top_products(orders: &[Order], limit: usize) -> Vec<TopProduct> {
    let mut by_product: HashMap<ProductId, TopProduct> = HashMap::new();
    for item in orders.iter().flat_map(|order| &order.items) {
        let entry = by_product
            .entry(item.product_id)
            .or_insert_with(|| TopProduct {
                product_id: item.product_id,
                name: item.name.clone(),
                quantity: 0,
                revenue: Money::ZERO,
            });
        entry.quantity += u64::from(item.quantity);
        entry.revenue += item.line_total();
    }

    let mut ranked: Vec<TopProduct> = by_product.into_values().collect();
    ranked.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

/// Number of orders in each status, in lifecycle order.
#[must_use]
pub fn status_breakdown(orders: &[Order]) -> Vec<(OrderStatus, u64)> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| {
            let count = orders.iter().filter(|o| o.status == status).count() as u64;
            (status, count)
        })
        .collect()
}

/// Bar geometry for the server-rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBar {
    pub label: String,
    pub total: String,
    pub count: u64,
    /// Height relative to the tallest bar, 0 to 100.
    pub height_pct: u32,
}

/// Scale bucket totals against the largest bucket.
#[must_use]
pub fn chart_bars(buckets: &[SalesBucket]) -> Vec<ChartBar> {
    let max = buckets
        .iter()
        .map(|b| b.total.to_f64_lossy())
        .fold(0.0_f64, f64::max);
    buckets
        .iter()
        .map(|bucket| {
            let height_pct = if max > 0.0 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let pct = (bucket.total.to_f64_lossy() / max * 100.0).round() as u32;
                pct.min(100)
            } else {
                0
            };
            ChartBar {
                label: bucket.label.clone(),
                total: bucket.total.to_string(),
                count: bucket.count,
                height_pct,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::supabase::OrderItem;
    use bizgrow_core::{OrderId, PaymentMethod, StoreId};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order_at(rfc3339: &str, rupees: i64) -> Order {
        Order {
            id: OrderId::random(),
            store_id: StoreId::random(),
            customer_id: None,
            customer_name: "Ravi".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_address: None,
            items: Vec::new(),
            total_amount: Money::from_rupees(rupees),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            notes: None,
            created_at: DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_range_parse() {
        assert_eq!(SalesRange::parse(Some("month")), SalesRange::Month);
        assert_eq!(SalesRange::parse(Some("year")), SalesRange::Year);
        assert_eq!(SalesRange::parse(Some("decade")), SalesRange::Week);
        assert_eq!(SalesRange::parse(None), SalesRange::Week);
    }

    #[test]
    fn test_week_buckets() {
        let buckets = build_buckets(SalesRange::Week, date(2026, 3, 15));
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].start, date(2026, 3, 9));
        assert_eq!(buckets[6].start, date(2026, 3, 15));
        assert_eq!(buckets[6].end, date(2026, 3, 16));
        assert_eq!(buckets[6].label, "Sun");
    }

    #[test]
    fn test_month_buckets() {
        let buckets = build_buckets(SalesRange::Month, date(2026, 3, 15));
        assert_eq!(buckets.len(), 30);
        assert_eq!(buckets[0].start, date(2026, 2, 14));
        assert_eq!(buckets[29].label, "15 Mar");
    }

    #[test]
    fn test_year_buckets_span_calendar_months() {
        let buckets = build_buckets(SalesRange::Year, date(2026, 3, 15));
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].start, date(2025, 4, 1));
        assert_eq!(buckets[0].label, "Apr");
        assert_eq!(buckets[11].start, date(2026, 3, 1));
        assert_eq!(buckets[11].end, date(2026, 4, 1));
    }

    #[test]
    fn test_same_day_orders_sum_and_count() {
        let orders = vec![
            order_at("2026-03-15T04:00:00Z", 100),
            order_at("2026-03-15T08:30:00Z", 200),
            order_at("2026-03-15T12:00:00Z", 50),
        ];
        let buckets = aggregate(
            build_buckets(SalesRange::Week, date(2026, 3, 15)),
            &orders,
            ist(),
        );
        let today = buckets.last().unwrap();
        assert_eq!(today.total, Money::from_rupees(350));
        assert_eq!(today.count, 3);
        assert!(buckets[..6].iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_orders_bucketed_by_local_date() {
        // 20:00 UTC on the 14th is 01:30 IST on the 15th
        let orders = vec![order_at("2026-03-14T20:00:00Z", 75)];
        let buckets = aggregate(
            build_buckets(SalesRange::Week, date(2026, 3, 15)),
            &orders,
            ist(),
        );
        assert_eq!(buckets[6].count, 1);
        assert_eq!(buckets[5].count, 0);
    }

    #[test]
    fn test_orders_outside_range_ignored() {
        let orders = vec![order_at("2026-01-01T06:00:00Z", 500)];
        let buckets = aggregate(
            build_buckets(SalesRange::Week, date(2026, 3, 15)),
            &orders,
            ist(),
        );
        assert!(buckets.iter().all(|b| b.count == 0 && b.total.is_zero()));
    }

    #[test]
    fn test_year_aggregation_groups_by_month() {
        let orders = vec![
            order_at("2026-03-01T06:00:00Z", 10),
            order_at("2026-03-31T06:00:00Z", 20),
            order_at("2026-02-10T06:00:00Z", 5),
        ];
        let buckets = aggregate(
            build_buckets(SalesRange::Year, date(2026, 3, 31)),
            &orders,
            ist(),
        );
        assert_eq!(buckets[11].total, Money::from_rupees(30));
        assert_eq!(buckets[11].count, 2);
        assert_eq!(buckets[10].count, 1);
    }

    #[test]
    fn test_query_window_uses_local_midnight() {
        let buckets = build_buckets(SalesRange::Week, date(2026, 3, 15));
        let (start, end) = query_window(&buckets, ist()).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-08T18:30:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-15T18:30:00+00:00");
    }

    #[test]
    fn test_revenue_delta() {
        assert_eq!(
            revenue_delta(Money::from_rupees(150), Money::from_rupees(100)),
            Some(Decimal::new(500, 1))
        );
        assert_eq!(revenue_delta(Money::from_rupees(150), Money::ZERO), None);
        assert_eq!(
            revenue_delta(Money::new(Decimal::MAX), Money::new(Decimal::new(1, 2))),
            None
        );
        assert_eq!(format_delta(Some(Decimal::new(-125, 1))), "-12.5%");
        assert_eq!(format_delta(Some(Decimal::new(500, 1))), "+50.0%");
        assert_eq!(format_delta(None), "n/a");
    }

    #[test]
    fn test_top_products_ranked_by_quantity_then_name() {
        let chai = ProductId::random();
        let rusk = ProductId::random();
        let mut first = order_at("2026-03-15T04:00:00Z", 0);
        first.items = vec![
            OrderItem {
                product_id: chai,
                name: "Chai".to_string(),
                price: Money::from_rupees(120),
                quantity: 2,
            },
            OrderItem {
                product_id: rusk,
                name: "Rusk".to_string(),
                price: Money::from_rupees(40),
                quantity: 2,
            },
        ];
        let mut second = order_at("2026-03-15T05:00:00Z", 0);
        second.items = vec![OrderItem {
            product_id: rusk,
            name: "Rusk".to_string(),
            price: Money::from_rupees(40),
            quantity: 1,
        }];

        let top = top_products(&[first.clone(), second], 5);
        assert_eq!(top[0].name, "Rusk");
        assert_eq!(top[0].quantity, 3);
        assert_eq!(top[0].revenue, Money::from_rupees(120));

        let tied = top_products(&[first], 5);
        assert_eq!(tied[0].name, "Chai");
        assert_eq!(tied[1].name, "Rusk");
    }

    #[test]
    fn test_status_breakdown_covers_all_statuses() {
        let mut shipped = order_at("2026-03-15T04:00:00Z", 10);
        shipped.status = OrderStatus::Shipped;
        let breakdown = status_breakdown(&[shipped, order_at("2026-03-15T04:00:00Z", 10)]);
        assert_eq!(breakdown.len(), 5);
        assert!(breakdown.contains(&(OrderStatus::Shipped, 1)));
        assert!(breakdown.contains(&(OrderStatus::Pending, 1)));
        assert!(breakdown.contains(&(OrderStatus::Delivered, 0)));
    }

    #[test]
    fn test_chart_bars_scale_to_max() {
        let mut buckets = build_buckets(SalesRange::Week, date(2026, 3, 15));
        buckets[0].total = Money::from_rupees(50);
        buckets[1].total = Money::from_rupees(200);
        let bars = chart_bars(&buckets);
        assert_eq!(bars[0].height_pct, 25);
        assert_eq!(bars[1].height_pct, 100);
        assert_eq!(bars[2].height_pct, 0);
    }
}
