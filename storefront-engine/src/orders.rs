//! Order directory
//!
//! Post-checkout order operations: status transitions (validated against
//! the fulfilment state machine) and read-only queries for admin
//! surfaces. Orders are immutable snapshots apart from their status and
//! its append-only history.

use crate::store::{Store, keys};
use shared::models::{AppliedPromo, Order, OrderStatus, StatusChange};
use shared::util::now_millis;
use thiserror::Error;

/// Order directory errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("illegal status transition: {from:?} → {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("failed to persist order update")]
    Persistence,
}

/// Coupon usage derived from the order history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponUsage {
    pub order_count: usize,
    pub total_discount: i64,
}

/// Order queries and status transitions over a shared [`Store`]
#[derive(Debug, Clone)]
pub struct OrderDirectory {
    store: Store,
}

impl OrderDirectory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Look up one order by id
    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.store.orders().into_iter().find(|o| o.id == order_id)
    }

    /// Move an order to a new status, appending to its status history.
    ///
    /// Returns `Ok(None)` for an unknown id (silent no-op). Transitions
    /// must follow the fulfilment state machine; `cancelled` is allowed
    /// from any non-terminal state.
    pub fn update_status(
        &self,
        order_id: &str,
        next: OrderStatus,
    ) -> Result<Option<Order>, OrderError> {
        let mut orders = self.store.orders();
        let Some(order) = orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(None);
        };

        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }

        let now = now_millis();
        order.status = next;
        order.updated_at = now;
        order.status_history.push(StatusChange {
            status: next,
            timestamp: now,
        });
        let updated = order.clone();

        if !self.store.set(keys::ORDERS, &orders) {
            return Err(OrderError::Persistence);
        }
        tracing::debug!(order_id = %order_id, status = ?next, "Order status updated");
        Ok(Some(updated))
    }

    /// Orders with the given status, or all orders when `None`
    pub fn orders_by_status(&self, status: Option<OrderStatus>) -> Vec<Order> {
        let orders = self.store.orders();
        match status {
            Some(status) => orders.into_iter().filter(|o| o.status == status).collect(),
            None => orders,
        }
    }

    /// Orders committed inside `[start, end]` (UTC millis, inclusive)
    pub fn orders_between(&self, start: i64, end: i64) -> Vec<Order> {
        self.store
            .orders()
            .into_iter()
            .filter(|order| order.timestamp >= start && order.timestamp <= end)
            .collect()
    }

    /// Orders containing at least one item from the restaurant
    pub fn orders_for_restaurant(&self, restaurant_id: &str) -> Vec<Order> {
        self.store
            .orders()
            .into_iter()
            .filter(|order| {
                order
                    .items
                    .iter()
                    .any(|item| item.restaurant_id == restaurant_id)
            })
            .collect()
    }

    /// How often a coupon was redeemed, and the discount it granted
    pub fn coupon_usage(&self, coupon_id: &str) -> CouponUsage {
        let redeemed: Vec<Order> = self
            .store
            .orders()
            .into_iter()
            .filter(|order| {
                order
                    .promo
                    .as_ref()
                    .is_some_and(|promo: &AppliedPromo| promo.coupon_id == coupon_id)
            })
            .collect();
        CouponUsage {
            order_count: redeemed.len(),
            total_discount: redeemed.iter().map(|order| order.discount).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Address, LineItem};

    fn sample_order(id: &str, timestamp: i64) -> Order {
        Order {
            id: id.to_string(),
            user_id: None,
            items: vec![LineItem {
                restaurant_id: "rest_001".into(),
                restaurant_name: "Mama Cass Kitchen".into(),
                item_id: "item_001".into(),
                name: "Jollof Rice".into(),
                price: 2500,
                quantity: 1,
                add_ons: Default::default(),
                special_instructions: String::new(),
                image: None,
                timestamp,
            }],
            address: Address {
                id: "addr_1".into(),
                user_id: None,
                label: "Home".into(),
                area: "Effurun".into(),
                street: "1 Main St".into(),
                directions: None,
            },
            schedule: "now".into(),
            payment_method: "cash".into(),
            delivery_notes: None,
            subtotal: 2500,
            delivery_fee: 300,
            discount: 0,
            total: 2800,
            promo: None,
            status: OrderStatus::Received,
            status_history: vec![StatusChange {
                status: OrderStatus::Received,
                timestamp,
            }],
            timestamp,
            updated_at: timestamp,
            estimated_delivery: timestamp + 35 * 60_000,
        }
    }

    fn directory_with_orders(orders: &[Order]) -> OrderDirectory {
        let store = Store::open_in_memory().unwrap();
        assert!(store.set(keys::ORDERS, &orders.to_vec()));
        OrderDirectory::new(store)
    }

    #[test]
    fn test_update_status_appends_history() {
        let directory = directory_with_orders(&[sample_order("ord_1", 1000)]);

        let updated = directory
            .update_status("ord_1", OrderStatus::Preparing)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(updated.status_history.len(), 2);
        assert_eq!(updated.status_history[1].status, OrderStatus::Preparing);
        assert!(updated.updated_at >= updated.timestamp);

        // Persisted, not just returned
        let stored = directory.order("ord_1").unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
    }

    #[test]
    fn test_update_status_unknown_id_is_silent_noop() {
        let directory = directory_with_orders(&[sample_order("ord_1", 1000)]);
        assert!(matches!(
            directory.update_status("ord_999", OrderStatus::Preparing),
            Ok(None)
        ));
    }

    #[test]
    fn test_update_status_rejects_illegal_transition() {
        let directory = directory_with_orders(&[sample_order("ord_1", 1000)]);

        let err = directory
            .update_status("ord_1", OrderStatus::Delivered)
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Received,
                to: OrderStatus::Delivered,
            }
        );

        // State unchanged after the rejection
        assert_eq!(
            directory.order("ord_1").unwrap().status,
            OrderStatus::Received
        );
    }

    #[test]
    fn test_cancel_allowed_until_terminal() {
        let directory = directory_with_orders(&[sample_order("ord_1", 1000)]);

        directory
            .update_status("ord_1", OrderStatus::Preparing)
            .unwrap();
        directory
            .update_status("ord_1", OrderStatus::Cancelled)
            .unwrap();
        assert_eq!(
            directory.order("ord_1").unwrap().status,
            OrderStatus::Cancelled
        );

        // Terminal: no further transitions
        assert!(
            directory
                .update_status("ord_1", OrderStatus::Ready)
                .is_err()
        );
    }

    #[test]
    fn test_orders_by_status_filters() {
        let mut second = sample_order("ord_2", 2000);
        second.status = OrderStatus::Delivered;
        let directory = directory_with_orders(&[sample_order("ord_1", 1000), second]);

        assert_eq!(directory.orders_by_status(None).len(), 2);
        assert_eq!(
            directory
                .orders_by_status(Some(OrderStatus::Delivered))
                .len(),
            1
        );
        assert!(
            directory
                .orders_by_status(Some(OrderStatus::Cancelled))
                .is_empty()
        );
    }

    #[test]
    fn test_orders_between_is_inclusive() {
        let directory = directory_with_orders(&[
            sample_order("ord_1", 1000),
            sample_order("ord_2", 2000),
            sample_order("ord_3", 3000),
        ]);

        let hits = directory.orders_between(1000, 2000);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|o| o.id != "ord_3"));
    }

    #[test]
    fn test_coupon_usage_sums_discounts() {
        let mut with_promo = sample_order("ord_2", 2000);
        with_promo.promo = Some(AppliedPromo {
            coupon_id: "coupon_001".into(),
            code: "SAVE10".into(),
            percent: 10,
            amount: 250,
        });
        with_promo.discount = 250;
        let directory = directory_with_orders(&[sample_order("ord_1", 1000), with_promo]);

        let usage = directory.coupon_usage("coupon_001");
        assert_eq!(usage.order_count, 1);
        assert_eq!(usage.total_discount, 250);
        assert_eq!(directory.coupon_usage("coupon_999"), CouponUsage::default());
    }

    #[test]
    fn test_orders_for_restaurant() {
        let directory = directory_with_orders(&[sample_order("ord_1", 1000)]);
        assert_eq!(directory.orders_for_restaurant("rest_001").len(), 1);
        assert!(directory.orders_for_restaurant("rest_999").is_empty());
    }
}
