//! Row shapes of the hosted tables.
//!
//! Reads use lenient `#[serde(default)]` fields because columns added later
//! in the hosted schema may be null on older rows. Writes use dedicated input
//! structs so generated columns (`id`, `created_at`) are never sent.

use bizgrow_core::{
    AdminRole, AdminUserId, CustomerId, Money, OrderId, OrderStatus, PaymentMethod, ProductId,
    StoreId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A merchant's store (tenant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Store profile fields written from the settings page.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInput {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub whatsapp_number: Option<String>,
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// A catalogue item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

/// Fields for a new or edited product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInput {
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_available: bool,
}

/// Availability toggle applied to many products at once.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AvailabilityChange {
    pub is_available: bool,
}

/// A line in an order, stored as JSON on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

/// A customer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Short reference shown to humans (first 8 hex digits of the ID).
    #[must_use]
    pub fn reference(&self) -> String {
        let id = self.id.to_string();
        id.chars().take(8).collect::<String>().to_uppercase()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Order submitted from the storefront checkout.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub store_id: StoreId,
    pub customer_id: Option<CustomerId>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Status change for a single order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

/// A store's customer, keyed by phone within the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub store_id: StoreId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub total_orders: i64,
    #[serde(default)]
    pub total_spent: Money,
    pub created_at: DateTime<Utc>,
}

/// Customer row written at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerInput {
    pub store_id: StoreId,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub total_orders: i64,
    pub total_spent: Money,
}

/// A platform user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row in `admin_users`; presence grants admin console access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub user_id: UserId,
    pub role: AdminRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_defaults_for_missing_columns() {
        let product: Product = serde_json::from_value(json!({
            "id": "6f1c2a7e-1b7c-4e5f-9a0b-2c3d4e5f6a7b",
            "store_id": "0a1b2c3d-1b7c-4e5f-9a0b-2c3d4e5f6a7b",
            "name": "Masala Chai",
            "price": 120,
            "created_at": "2026-01-05T10:00:00+00:00"
        }))
        .unwrap();
        assert!(product.is_available);
        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.price, Money::from_rupees(120));
    }

    #[test]
    fn test_order_items_and_reference() {
        let order: Order = serde_json::from_value(json!({
            "id": "6f1c2a7e-1b7c-4e5f-9a0b-2c3d4e5f6a7b",
            "store_id": "0a1b2c3d-1b7c-4e5f-9a0b-2c3d4e5f6a7b",
            "customer_name": "Ravi",
            "customer_phone": "9876543210",
            "items": [
                { "product_id": "1a1b2c3d-1b7c-4e5f-9a0b-2c3d4e5f6a7b", "name": "Chai", "price": "120.00", "quantity": 2 },
                { "product_id": "2a1b2c3d-1b7c-4e5f-9a0b-2c3d4e5f6a7b", "name": "Rusk", "price": 40, "quantity": 1 }
            ],
            "total_amount": "280.00",
            "status": "confirmed",
            "payment_method": "upi",
            "created_at": "2026-01-05T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(order.reference(), "6F1C2A7E");
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.items[0].line_total(), Money::from_rupees(240));
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn test_store_input_omits_missing_logo() {
        let input = StoreInput {
            user_id: UserId::random(),
            name: "Rao Stores".to_string(),
            description: None,
            whatsapp_number: None,
            address: None,
            logo_url: None,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("logo_url").is_none());
        assert!(value.get("description").is_some());
    }
}
