//! Delivery board: confirmed, shipped and delivered orders in columns.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query as QueryParams, State},
    response::{IntoResponse, Redirect},
};
use bizgrow_core::{DeliveryStage, OrderId, OrderStatus};
use chrono::FixedOffset;
use tracing::instrument;

use super::orders::{OrderRowView, change_status};
use super::{Merchant, Shell};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::{FlashQuery, Toast, redirect_error};
use crate::state::AppState;
use crate::supabase::{Order, Query, tables};

const BOARD_PATH: &str = "/dashboard/delivery";

/// Board columns, left to right.
const STAGES: [DeliveryStage; 3] = [
    DeliveryStage::ReadyToShip,
    DeliveryStage::InTransit,
    DeliveryStage::Delivered,
];

/// A card on the board.
#[derive(Clone)]
pub struct DeliveryCard {
    pub order: OrderRowView,
    pub phone: String,
    pub address: Option<String>,
    /// Label of the advance button, when the order can move on.
    pub advance_label: Option<&'static str>,
}

/// One board column.
#[derive(Clone)]
pub struct DeliveryColumn {
    pub label: &'static str,
    pub cards: Vec<DeliveryCard>,
}

/// Group orders into board columns. Orders not on the board are skipped.
#[must_use]
pub fn build_board(orders: &[Order], offset: FixedOffset) -> Vec<DeliveryColumn> {
    STAGES
        .iter()
        .map(|stage| DeliveryColumn {
            label: stage.label(),
            cards: orders
                .iter()
                .filter(|order| DeliveryStage::for_status(order.status) == Some(*stage))
                .map(|order| DeliveryCard {
                    order: OrderRowView::new(order, offset),
                    phone: order.customer_phone.clone(),
                    address: order.customer_address.clone(),
                    advance_label: order.status.next().map(|next| match next {
                        OrderStatus::Shipped => "Mark shipped",
                        OrderStatus::Delivered => "Mark delivered",
                        _ => "Advance",
                    }),
                })
                .collect(),
        })
        .collect()
}

/// Delivery board template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/delivery.html")]
pub struct DeliveryTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub columns: Vec<DeliveryColumn>,
}

/// Display the board.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn board(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(flash): QueryParams<FlashQuery>,
) -> Result<impl IntoResponse> {
    let statuses = OrderStatus::ALL
        .into_iter()
        .filter(|status| DeliveryStage::for_status(*status).is_some());
    let orders: Vec<Order> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::ORDERS,
            &Query::new()
                .eq("store_id", merchant.store.id)
                .in_list("status", statuses)
                .order("created_at", true),
        )
        .await?;

    Ok(DeliveryTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "delivery"),
        columns: build_board(&orders, state.config().utc_offset),
    })
}

/// Move an order one step along the board.
///
/// # Errors
///
/// Returns 404 if the order is not in the merchant's store.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn advance(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<OrderId>,
) -> Result<Redirect> {
    let order: Order = state
        .supabase()
        .select_one(
            merchant.caller(),
            tables::ORDERS,
            Query::new().eq("id", id).eq("store_id", merchant.store.id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let Some(next) = order.status.next() else {
        return Ok(redirect_error(BOARD_PATH, "invalid_transition"));
    };
    Ok(change_status(&state, &merchant, &order, next, BOARD_PATH).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bizgrow_core::{Money, PaymentMethod, StoreId};
    use chrono::Utc;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::random(),
            store_id: StoreId::random(),
            customer_id: None,
            customer_name: "Meera".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_address: Some("12 MG Road".to_string()),
            items: Vec::new(),
            total_amount: Money::from_rupees(450),
            status,
            payment_method: PaymentMethod::CashOnDelivery,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_board_groups_by_stage() {
        let orders = vec![
            order(OrderStatus::Pending),
            order(OrderStatus::Confirmed),
            order(OrderStatus::Shipped),
            order(OrderStatus::Shipped),
            order(OrderStatus::Delivered),
            order(OrderStatus::Cancelled),
        ];
        let board = build_board(&orders, FixedOffset::east_opt(0).unwrap());
        let counts: Vec<(&str, usize)> = board.iter().map(|c| (c.label, c.cards.len())).collect();
        assert_eq!(
            counts,
            vec![("Ready to ship", 1), ("In transit", 2), ("Delivered", 1)]
        );
    }

    #[test]
    fn test_delivered_cards_cannot_advance() {
        let board = build_board(
            &[order(OrderStatus::Confirmed), order(OrderStatus::Delivered)],
            FixedOffset::east_opt(0).unwrap(),
        );
        let labels: Vec<Option<&str>> = board
            .iter()
            .flat_map(|c| c.cards.iter().map(|card| card.advance_label))
            .collect();
        assert_eq!(labels, vec![Some("Mark shipped"), None]);
    }
}
