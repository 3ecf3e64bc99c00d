//! Order Model

use super::address::Address;
use super::cart_item::LineItem;
use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Fulfilment walks `Received → Preparing → Ready → OutForDelivery →
/// Delivered`; `Cancelled` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Received,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The next status on the fulfilment path, if any
    pub fn successor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Received => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether `next` is a legal transition from this status
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if next == OrderStatus::Cancelled {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

/// One entry in an order's append-only status log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub timestamp: i64,
}

/// A promo code accepted against a cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedPromo {
    pub coupon_id: String,
    pub code: String,
    /// Percentage discount at acceptance time
    pub percent: u32,
    /// Discount amount in minor units, floor(subtotal × percent / 100)
    pub amount: i64,
}

/// Immutable order snapshot produced at checkout.
///
/// Totals are frozen at commit; later catalog or price changes never
/// retroactively alter a historical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub items: Vec<LineItem>,
    pub address: Address,
    /// "now" or a requested delivery slot
    pub schedule: String,
    pub payment_method: String,
    pub delivery_notes: Option<String>,
    /// Item subtotal in minor units
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub discount: i64,
    pub total: i64,
    pub promo: Option<AppliedPromo>,
    pub status: OrderStatus,
    /// Append-only log; seeded with the initial `received` entry
    pub status_history: Vec<StatusChange>,
    /// Commit instant (UTC millis)
    pub timestamp: i64,
    pub updated_at: i64,
    /// Estimated delivery instant (UTC millis)
    pub estimated_delivery: i64,
}

impl super::HasId for Order {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Checkout details supplied by the caller; everything priced or derived
/// (totals, id, estimate) is computed by the cart engine at commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub user_id: Option<String>,
    pub address: Address,
    pub schedule: String,
    pub payment_method: String,
    pub delivery_notes: Option<String>,
    pub promo: Option<AppliedPromo>,
}
