//! WhatsApp click-to-chat links and message templates.
//!
//! Nothing is sent from the server: pages render `wa.me` links that open
//! WhatsApp with the message pre-filled.

use bizgrow_core::Money;
use serde::Deserialize;

/// Country code prefixed to bare 10-digit numbers.
const DEFAULT_COUNTRY_CODE: &str = "91";

/// Digits-only international number for `wa.me`.
///
/// Formatting characters are dropped. Ten-digit numbers (and ten digits
/// behind a trunk `0`) get the `91` prefix. Returns `None` when fewer than
/// ten digits remain.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Some(format!("{DEFAULT_COUNTRY_CODE}{digits}")),
        11 if digits.starts_with('0') => Some(format!(
            "{DEFAULT_COUNTRY_CODE}{}",
            digits.trim_start_matches('0')
        )),
        11..=15 => Some(digits),
        _ => None,
    }
}

/// `wa.me` link opening a chat with `phone`, message pre-filled.
#[must_use]
pub fn chat_link(phone: &str, message: &str) -> Option<String> {
    let phone = normalize_phone(phone)?;
    Some(format!(
        "https://wa.me/{phone}?text={}",
        urlencoding::encode(message)
    ))
}

/// `wa.me` link with no fixed recipient; WhatsApp asks who to send it to.
#[must_use]
pub fn share_link(message: &str) -> String {
    format!("https://wa.me/?text={}", urlencoding::encode(message))
}

/// Canned messages offered on the WhatsApp page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTemplate {
    #[default]
    OrderConfirmation,
    ShippingUpdate,
    DeliveryConfirmation,
    Promotion,
}

impl MessageTemplate {
    pub const ALL: [Self; 4] = [
        Self::OrderConfirmation,
        Self::ShippingUpdate,
        Self::DeliveryConfirmation,
        Self::Promotion,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderConfirmation => "order_confirmation",
            Self::ShippingUpdate => "shipping_update",
            Self::DeliveryConfirmation => "delivery_confirmation",
            Self::Promotion => "promotion",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrderConfirmation => "Order confirmation",
            Self::ShippingUpdate => "Shipping update",
            Self::DeliveryConfirmation => "Delivery confirmation",
            Self::Promotion => "Promotion",
        }
    }

    /// Whether the template talks about a specific order.
    #[must_use]
    pub const fn needs_order(self) -> bool {
        !matches!(self, Self::Promotion)
    }

    /// Fill the template.
    #[must_use]
    pub fn render(self, ctx: &MessageContext<'_>) -> String {
        let order = ctx
            .order_reference
            .map(|r| format!(" #{r}"))
            .unwrap_or_default();
        let total = ctx
            .total
            .map(|t| format!(" of {t}"))
            .unwrap_or_default();
        match self {
            Self::OrderConfirmation => format!(
                "Hi {}, thank you for shopping with {}! Your order{order}{total} is confirmed. We will let you know when it ships.",
                ctx.customer_name, ctx.store_name
            ),
            Self::ShippingUpdate => format!(
                "Hi {}, good news! Your order{order} from {} has been shipped and is on its way.",
                ctx.customer_name, ctx.store_name
            ),
            Self::DeliveryConfirmation => format!(
                "Hi {}, your order{order} from {} has been delivered. We hope you love it! Reply here if anything is not right.",
                ctx.customer_name, ctx.store_name
            ),
            Self::Promotion => format!(
                "Hi {}, new arrivals are in at {}! Browse the latest products here: {}",
                ctx.customer_name, ctx.store_name, ctx.storefront_url
            ),
        }
    }
}

/// Values substituted into a [`MessageTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub store_name: &'a str,
    pub customer_name: &'a str,
    pub storefront_url: &'a str,
    pub order_reference: Option<&'a str>,
    pub total: Option<Money>,
}

/// Message a shopper sends the merchant after checking out.
#[must_use]
pub fn order_placed_message(store_name: &str, order_reference: &str, total: Money) -> String {
    format!("Hi {store_name}, I just placed order #{order_reference} for {total}. Please confirm.")
}
