//! Platform admin console.
//!
//! Read-only views across every store. Requests run as the admin's own
//! session; the backend's policies grant `admin_users` members read access
//! to all tenants.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use bizgrow_core::{Money, StoreId, UserId};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::Toast;
use crate::services::analytics::{
    ChartBar, SalesRange, aggregate, build_buckets, chart_bars, local_date, query_window,
};
use crate::state::AppState;
use crate::supabase::{Caller, Order, Profile, Query, Store, tables};

/// Layout data shared by admin pages.
#[derive(Clone)]
pub struct AdminShell {
    pub active: &'static str,
    pub user_name: String,
    pub role: &'static str,
}

impl AdminShell {
    fn new(admin: &RequireAdmin, active: &'static str) -> Self {
        Self {
            active,
            user_name: admin.user.display_name().to_string(),
            role: admin.role.label(),
        }
    }
}

const fn caller(admin: &RequireAdmin) -> Caller<'_> {
    Caller::User(&admin.user.access_token)
}

/// Admin overview template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/overview.html")]
pub struct AdminOverviewTemplate {
    pub toast: Option<Toast>,
    pub shell: AdminShell,
    pub store_count: u64,
    pub product_count: u64,
    pub order_count: u64,
    pub customer_count: u64,
    pub revenue: String,
    pub bars: Vec<ChartBar>,
}

/// Store row in the admin list.
#[derive(Clone)]
pub struct StoreRowView {
    pub id: StoreId,
    pub name: String,
    pub owner: String,
    pub product_count: usize,
    pub created: String,
}

/// Admin store list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/stores.html")]
pub struct AdminStoresTemplate {
    pub toast: Option<Toast>,
    pub shell: AdminShell,
    pub stores: Vec<StoreRowView>,
}

/// Merchant row in the admin list.
#[derive(Clone)]
pub struct MerchantRowView {
    pub name: String,
    pub email: String,
    pub store_name: Option<String>,
    pub joined: String,
}

/// Admin merchant list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/merchants.html")]
pub struct AdminMerchantsTemplate {
    pub toast: Option<Toast>,
    pub shell: AdminShell,
    pub merchants: Vec<MerchantRowView>,
}

#[derive(Debug, Deserialize)]
struct AmountRow {
    total_amount: Money,
}

#[derive(Debug, Deserialize)]
struct StoreRef {
    store_id: StoreId,
}

/// Platform totals and the last 30 days of sales.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn overview(State(state): State<AppState>, admin: RequireAdmin) -> Result<impl IntoResponse> {
    let client = state.supabase();
    let everything = Query::new();

    let store_count = client.count(caller(&admin), tables::STORES, &everything).await?;
    let product_count = client
        .count(caller(&admin), tables::PRODUCTS, &everything)
        .await?;
    let order_count = client.count(caller(&admin), tables::ORDERS, &everything).await?;
    let customer_count = client
        .count(caller(&admin), tables::CUSTOMERS, &everything)
        .await?;

    let amounts: Vec<AmountRow> = client
        .select(
            caller(&admin),
            tables::ORDERS,
            &Query::new().select("total_amount"),
        )
        .await?;
    let revenue: Money = amounts.iter().map(|row| row.total_amount).sum();

    let offset = state.config().utc_offset;
    let buckets = build_buckets(SalesRange::Month, local_date(Utc::now(), offset));
    let (start, end) = query_window(&buckets, offset)
        .ok_or_else(|| AppError::Internal("no window for admin sales series".to_string()))?;
    let recent: Vec<Order> = client
        .select(
            caller(&admin),
            tables::ORDERS,
            &Query::new()
                .gte("created_at", start.to_rfc3339())
                .lt("created_at", end.to_rfc3339()),
        )
        .await?;

    Ok(AdminOverviewTemplate {
        toast: None,
        shell: AdminShell::new(&admin, "overview"),
        store_count,
        product_count,
        order_count,
        customer_count,
        revenue: revenue.to_string(),
        bars: chart_bars(&aggregate(buckets, &recent, offset)),
    })
}

/// Count products per store.
fn products_per_store(refs: &[StoreRef]) -> HashMap<StoreId, usize> {
    let mut counts = HashMap::new();
    for r in refs {
        *counts.entry(r.store_id).or_insert(0) += 1;
    }
    counts
}

fn profile_label(profile: &Profile) -> String {
    profile
        .full_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| profile.email.clone())
        .unwrap_or_else(|| profile.id.to_string())
}

/// Every store with its owner and product count.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn stores(State(state): State<AppState>, admin: RequireAdmin) -> Result<impl IntoResponse> {
    let client = state.supabase();
    let stores: Vec<Store> = client
        .select(
            caller(&admin),
            tables::STORES,
            &Query::new().order("created_at", false),
        )
        .await?;
    let refs: Vec<StoreRef> = client
        .select(
            caller(&admin),
            tables::PRODUCTS,
            &Query::new().select("store_id"),
        )
        .await?;

    let owner_ids: Vec<UserId> = stores.iter().map(|s| s.user_id).collect();
    let owners: HashMap<UserId, String> = if owner_ids.is_empty() {
        HashMap::new()
    } else {
        let profiles: Vec<Profile> = client
            .select(
                caller(&admin),
                tables::PROFILES,
                &Query::new().in_list("id", &owner_ids),
            )
            .await?;
        profiles.iter().map(|p| (p.id, profile_label(p))).collect()
    };
    let counts = products_per_store(&refs);

    Ok(AdminStoresTemplate {
        toast: None,
        shell: AdminShell::new(&admin, "stores"),
        stores: stores
            .iter()
            .map(|store| StoreRowView {
                id: store.id,
                name: store.name.clone(),
                owner: owners
                    .get(&store.user_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                product_count: counts.get(&store.id).copied().unwrap_or(0),
                created: store.created_at.format("%-d %b %Y").to_string(),
            })
            .collect(),
    })
}

/// Every merchant profile with their store, if any.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn merchants(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> Result<impl IntoResponse> {
    let client = state.supabase();
    let profiles: Vec<Profile> = client
        .select(
            caller(&admin),
            tables::PROFILES,
            &Query::new().order("created_at", false),
        )
        .await?;
    let stores: Vec<Store> = client
        .select(caller(&admin), tables::STORES, &Query::new())
        .await?;
    let store_names: HashMap<UserId, String> = stores
        .into_iter()
        .map(|store| (store.user_id, store.name))
        .collect();

    Ok(AdminMerchantsTemplate {
        toast: None,
        shell: AdminShell::new(&admin, "merchants"),
        merchants: profiles
            .iter()
            .map(|profile| MerchantRowView {
                name: profile_label(profile),
                email: profile.email.clone().unwrap_or_default(),
                store_name: store_names.get(&profile.id).cloned(),
                joined: profile
                    .created_at
                    .map(|at| at.format("%-d %b %Y").to_string())
                    .unwrap_or_default(),
            })
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_products_per_store() {
        let a = StoreId::random();
        let b = StoreId::random();
        let refs = vec![
            StoreRef { store_id: a },
            StoreRef { store_id: b },
            StoreRef { store_id: a },
        ];
        let counts = products_per_store(&refs);
        assert_eq!(counts.get(&a), Some(&2));
        assert_eq!(counts.get(&b), Some(&1));
    }

    #[test]
    fn test_profile_label_prefers_name() {
        let mut profile = Profile {
            id: UserId::random(),
            email: Some("ravi@example.in".to_string()),
            full_name: Some(" ".to_string()),
            created_at: None,
        };
        assert_eq!(profile_label(&profile), "ravi@example.in");
        profile.full_name = Some("Ravi Rao".to_string());
        assert_eq!(profile_label(&profile), "Ravi Rao");
    }
}
