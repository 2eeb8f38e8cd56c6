//! WhatsApp click-to-chat messages.
//!
//! Nothing is sent from here. Each message becomes a `wa.me` link that
//! opens WhatsApp with the text filled in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query as QueryParams, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use super::{Merchant, Shell};
use crate::error::Result;
use crate::filters;
use crate::routes::{FlashQuery, Toast, redirect_error};
use crate::services::whatsapp::{MessageContext, MessageTemplate, chat_link, share_link};
use crate::state::AppState;
use crate::supabase::{Customer, Order, Query, tables};

const PAGE_PATH: &str = "/dashboard/whatsapp";
const RECENT_ORDERS: usize = 20;
const RECENT_CUSTOMERS: usize = 50;

/// Template picker tab.
#[derive(Clone)]
pub struct TemplateTab {
    pub value: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// A prepared message.
#[derive(Clone)]
pub struct MessageRow {
    pub recipient: String,
    pub detail: String,
    pub message: String,
    /// `None` when the recipient's phone number is unusable.
    pub link: Option<String>,
}

/// WhatsApp page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/whatsapp.html")]
pub struct WhatsAppTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub tabs: Vec<TemplateTab>,
    pub rows: Vec<MessageRow>,
    pub broadcast_link: Option<String>,
}

/// Query parameters of the WhatsApp page.
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppQuery {
    pub template: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Free-form message form.
#[derive(Debug, Deserialize)]
pub struct ComposeForm {
    pub phone: String,
    pub message: String,
}

fn parse_template(value: Option<&str>) -> MessageTemplate {
    value
        .and_then(|v| MessageTemplate::ALL.into_iter().find(|t| t.as_str() == v))
        .unwrap_or_default()
}

/// One message per order, addressed to the order's customer.
#[must_use]
pub fn order_rows(
    template: MessageTemplate,
    store_name: &str,
    storefront_url: &str,
    orders: &[Order],
) -> Vec<MessageRow> {
    orders
        .iter()
        .map(|order| {
            let reference = order.reference();
            let message = template.render(&MessageContext {
                store_name,
                customer_name: &order.customer_name,
                storefront_url,
                order_reference: Some(&reference),
                total: Some(order.total_amount),
            });
            MessageRow {
                recipient: order.customer_name.clone(),
                detail: format!("#{reference} · {}", order.status.label()),
                link: chat_link(&order.customer_phone, &message),
                message,
            }
        })
        .collect()
}

/// One message per customer, for templates that are not about an order.
#[must_use]
pub fn customer_rows(
    template: MessageTemplate,
    store_name: &str,
    storefront_url: &str,
    customers: &[Customer],
) -> Vec<MessageRow> {
    customers
        .iter()
        .map(|customer| {
            let message = template.render(&MessageContext {
                store_name,
                customer_name: &customer.name,
                storefront_url,
                order_reference: None,
                total: None,
            });
            MessageRow {
                recipient: customer.name.clone(),
                detail: customer.phone.clone(),
                link: chat_link(&customer.phone, &message),
                message,
            }
        })
        .collect()
}

/// Display prepared messages for the chosen template.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn page(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(query): QueryParams<WhatsAppQuery>,
) -> Result<impl IntoResponse> {
    let template = parse_template(query.template.as_deref());
    let storefront_url = state.config().storefront_url(merchant.store.id);
    let store_name = merchant.store.name.as_str();
    let by_store = Query::new()
        .eq("store_id", merchant.store.id)
        .order("created_at", false);

    let (rows, broadcast_link) = if template.needs_order() {
        let orders: Vec<Order> = state
            .supabase()
            .select(
                merchant.caller(),
                tables::ORDERS,
                &by_store.limit(RECENT_ORDERS),
            )
            .await?;
        (
            order_rows(template, store_name, &storefront_url, &orders),
            None,
        )
    } else {
        let customers: Vec<Customer> = state
            .supabase()
            .select(
                merchant.caller(),
                tables::CUSTOMERS,
                &by_store.limit(RECENT_CUSTOMERS),
            )
            .await?;
        let broadcast = template.render(&MessageContext {
            store_name,
            customer_name: "there",
            storefront_url: &storefront_url,
            order_reference: None,
            total: None,
        });
        (
            customer_rows(template, store_name, &storefront_url, &customers),
            Some(share_link(&broadcast)),
        )
    };

    let flash = FlashQuery {
        error: query.error,
        success: query.success,
    };
    Ok(WhatsAppTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "whatsapp"),
        tabs: MessageTemplate::ALL
            .into_iter()
            .map(|t| TemplateTab {
                value: t.as_str(),
                label: t.label(),
                active: t == template,
            })
            .collect(),
        rows,
        broadcast_link,
    })
}

/// Open a chat with a free-form message.
#[instrument(skip(_merchant, form))]
pub async fn compose(_merchant: Merchant, Form(form): Form<ComposeForm>) -> Redirect {
    let message = form.message.trim();
    if message.is_empty() {
        return redirect_error(PAGE_PATH, "message_required");
    }
    match chat_link(&form.phone, message) {
        Some(link) => Redirect::to(&link),
        None => redirect_error(PAGE_PATH, "invalid_phone"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bizgrow_core::{CustomerId, Money, OrderId, OrderStatus, PaymentMethod, StoreId};
    use chrono::Utc;

    #[test]
    fn test_unknown_template_falls_back() {
        assert_eq!(parse_template(Some("promotion")), MessageTemplate::Promotion);
        assert_eq!(
            parse_template(Some("spam")),
            MessageTemplate::OrderConfirmation
        );
        assert_eq!(parse_template(None), MessageTemplate::OrderConfirmation);
    }

    #[test]
    fn test_order_rows_link_to_customer() {
        let order = Order {
            id: OrderId::random(),
            store_id: StoreId::random(),
            customer_id: None,
            customer_name: "Kiran".to_string(),
            customer_phone: "98765 43210".to_string(),
            customer_address: None,
            items: Vec::new(),
            total_amount: Money::from_rupees(300),
            status: OrderStatus::Shipped,
            payment_method: PaymentMethod::Upi,
            notes: None,
            created_at: Utc::now(),
        };
        let rows = order_rows(
            MessageTemplate::ShippingUpdate,
            "Rao Stores",
            "https://bizgrow.example/store/1",
            &[order],
        );
        let row = rows.first().unwrap();
        assert!(row.message.contains("Kiran"));
        assert!(row.message.contains("has been shipped"));
        assert!(
            row.link
                .as_deref()
                .unwrap()
                .starts_with("https://wa.me/919876543210?text=")
        );
    }

    #[test]
    fn test_customer_rows_skip_bad_numbers() {
        let customer = Customer {
            id: CustomerId::random(),
            store_id: StoreId::random(),
            name: "Anil".to_string(),
            phone: "123".to_string(),
            email: None,
            address: None,
            total_orders: 1,
            total_spent: Money::from_rupees(100),
            created_at: Utc::now(),
        };
        let rows = customer_rows(
            MessageTemplate::Promotion,
            "Rao Stores",
            "https://bizgrow.example/store/1",
            &[customer],
        );
        let row = rows.first().unwrap();
        assert!(row.link.is_none());
        assert!(row.message.contains("https://bizgrow.example/store/1"));
    }
}
