//! Storefront cart held in the visitor's session.
//!
//! The session only stores product IDs and quantities. Names and prices are
//! joined from the live catalogue when the cart is rendered or checked out, so
//! totals always follow the merchant's current prices.

use std::collections::BTreeMap;

use bizgrow_core::{Money, ProductId, StoreId};
use serde::{Deserialize, Serialize};

use crate::supabase::{OrderItem, Product};

/// Largest quantity of one product a cart accepts.
pub const MAX_QUANTITY: u32 = 99;

/// Session key of the cart for one store.
#[must_use]
pub fn session_key(store_id: StoreId) -> String {
    format!("cart:{store_id}")
}

/// Product quantities for one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: BTreeMap<ProductId, u32>,
}

impl Cart {
    /// Add `quantity` units, capped at [`MAX_QUANTITY`].
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        let current = self.lines.get(&product_id).copied().unwrap_or(0);
        self.set(product_id, current.saturating_add(quantity.max(1)));
    }

    /// Set the quantity; zero removes the line.
    pub fn set(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.lines.remove(&product_id);
        } else {
            self.lines.insert(product_id, quantity.min(MAX_QUANTITY));
        }
    }

    /// Remove a line.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.remove(&product_id);
    }

    /// Total units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.values().sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of one product.
    #[must_use]
    pub fn quantity(&self, product_id: ProductId) -> u32 {
        self.lines.get(&product_id).copied().unwrap_or(0)
    }

    /// Join the cart against the catalogue.
    ///
    /// Lines whose product is gone or no longer available are dropped and
    /// reported in `unavailable`.
    #[must_use]
    pub fn price(&self, catalogue: &[Product]) -> PricedCart {
        let mut items = Vec::new();
        let mut unavailable = Vec::new();
        for (&product_id, &quantity) in &self.lines {
            match catalogue
                .iter()
                .find(|p| p.id == product_id && p.is_available)
            {
                Some(product) => items.push(OrderItem {
                    product_id,
                    name: product.name.clone(),
                    price: product.price,
                    quantity,
                }),
                None => unavailable.push(product_id),
            }
        }
        let total = items.iter().map(OrderItem::line_total).sum();
        PricedCart {
            items,
            total,
            unavailable,
        }
    }
}

/// Cart lines with current prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub unavailable: Vec<ProductId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(name: &str, rupees: i64, available: bool) -> Product {
        Product {
            id: ProductId::random(),
            store_id: StoreId::random(),
            name: name.to_string(),
            description: None,
            price: Money::from_rupees(rupees),
            category: None,
            image_url: None,
            stock_quantity: 10,
            is_available: available,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_accumulates_and_caps() {
        let id = ProductId::random();
        let mut cart = Cart::default();
        cart.add(id, 2);
        cart.add(id, 3);
        assert_eq!(cart.quantity(id), 5);
        cart.add(id, 500);
        assert_eq!(cart.quantity(id), MAX_QUANTITY);
    }

    #[test]
    fn test_add_zero_counts_as_one() {
        let id = ProductId::random();
        let mut cart = Cart::default();
        cart.add(id, 0);
        assert_eq!(cart.quantity(id), 1);
    }

    #[test]
    fn test_set_zero_removes() {
        let id = ProductId::random();
        let mut cart = Cart::default();
        cart.add(id, 2);
        cart.set(id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_price_uses_catalogue_prices() {
        let chai = product("Chai", 120, true);
        let rusk = product("Rusk", 40, true);
        let mut cart = Cart::default();
        cart.add(chai.id, 2);
        cart.add(rusk.id, 1);

        let priced = cart.price(&[chai, rusk]);
        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.total, Money::from_rupees(280));
        assert!(priced.unavailable.is_empty());
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_price_drops_unavailable_lines() {
        let chai = product("Chai", 120, true);
        let hidden = product("Hidden", 10, false);
        let gone = ProductId::random();
        let mut cart = Cart::default();
        cart.add(chai.id, 1);
        cart.add(hidden.id, 1);
        cart.add(gone, 1);

        let priced = cart.price(&[chai, hidden.clone()]);
        assert_eq!(priced.items.len(), 1);
        assert_eq!(priced.total, Money::from_rupees(120));
        assert_eq!(priced.unavailable.len(), 2);
        assert!(priced.unavailable.contains(&hidden.id));
    }
}
