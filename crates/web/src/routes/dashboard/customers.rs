//! Customer list and detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query as QueryParams, State},
    response::{IntoResponse, Response},
};
use bizgrow_core::CustomerId;
use serde::Deserialize;
use tracing::instrument;

use super::orders::OrderRowView;
use super::{Merchant, Shell, csv_download};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::{FlashQuery, Toast, non_empty};
use crate::services::csv_io;
use crate::services::whatsapp::chat_link;
use crate::state::AppState;
use crate::supabase::{Customer, Order, Query, tables};

/// Customer row for the list.
#[derive(Clone)]
pub struct CustomerRowView {
    pub id: CustomerId,
    pub name: String,
    pub phone: String,
    pub total_orders: i64,
    pub total_spent: String,
    pub since: String,
}

impl From<&Customer> for CustomerRowView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            total_orders: customer.total_orders,
            total_spent: customer.total_spent.to_string(),
            since: customer.created_at.format("%b %Y").to_string(),
        }
    }
}

/// Customer list template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/customers/index.html")]
pub struct CustomersTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub customers: Vec<CustomerRowView>,
    pub search: String,
}

/// Customer detail template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/customers/show.html")]
pub struct CustomerTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub customer: CustomerRowView,
    pub email: Option<String>,
    pub address: Option<String>,
    pub whatsapp_link: Option<String>,
    pub orders: Vec<OrderRowView>,
}

/// Query parameters of the customer list.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    #[serde(alias = "search")]
    pub q: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Display customers, optionally searched by name or phone.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn index(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(query): QueryParams<CustomerListQuery>,
) -> Result<impl IntoResponse> {
    let search = non_empty(query.q);
    let mut filter = Query::new().eq("store_id", merchant.store.id);
    if let Some(term) = &search {
        filter = filter.ilike_any(&["name", "phone"], term);
    }
    let customers: Vec<Customer> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::CUSTOMERS,
            &filter.order("created_at", false),
        )
        .await?;

    let flash = FlashQuery {
        error: query.error,
        success: query.success,
    };
    Ok(CustomersTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "customers"),
        customers: customers.iter().map(CustomerRowView::from).collect(),
        search: search.unwrap_or_default(),
    })
}

/// Display a customer and their orders.
///
/// # Errors
///
/// Returns 404 if the customer is not in the merchant's store.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn show(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<CustomerId>,
) -> Result<impl IntoResponse> {
    let client = state.supabase();
    let store_id = merchant.store.id;
    let customer: Customer = client
        .select_one(
            merchant.caller(),
            tables::CUSTOMERS,
            Query::new().eq("id", id).eq("store_id", store_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;
    let orders: Vec<Order> = client
        .select(
            merchant.caller(),
            tables::ORDERS,
            &Query::new()
                .eq("store_id", store_id)
                .eq("customer_id", id)
                .order("created_at", false),
        )
        .await?;

    let offset = state.config().utc_offset;
    Ok(CustomerTemplate {
        toast: None,
        shell: merchant.shell(&state, "customers"),
        whatsapp_link: chat_link(
            &customer.phone,
            &format!("Hi {}, this is {}.", customer.name, merchant.store.name),
        ),
        customer: CustomerRowView::from(&customer),
        email: customer.email,
        address: customer.address,
        orders: orders
            .iter()
            .map(|order| OrderRowView::new(order, offset))
            .collect(),
    })
}

/// Download all customers as CSV.
///
/// # Errors
///
/// Returns an error if the backend or CSV writer fails.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn export_csv(State(state): State<AppState>, merchant: Merchant) -> Result<Response> {
    let customers: Vec<Customer> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::CUSTOMERS,
            &Query::new()
                .eq("store_id", merchant.store.id)
                .order("name", true),
        )
        .await?;
    let bytes = csv_io::export_customers(&customers)?;
    Ok(csv_download("customers.csv", bytes))
}
