//! Cart engine
//!
//! Owns the pending line items: identity/deduplication, derived pricing
//! over add-ons, checkout validation against live catalog state, atomic
//! order commit, promo codes, delivery-fee resolution, and the offline
//! snapshot channel.
//!
//! # State
//!
//! The persisted `cart` slot is the source of truth. Each engine keeps an
//! in-memory view as a cache: its own mutations write through, and
//! [`CartEngine::sync`] refreshes the view when another handle sharing
//! the same store changed the slot. Writes are last-write-wins at slot
//! granularity; two handles racing to append can lose one append.
//!
//! # Commit flow
//!
//! ```text
//! create_order(draft)
//!     ├─ 1. Run checkout validation (all errors collected)
//!     ├─ 2. Price: subtotal, delivery fee, promo discount, total
//!     ├─ 3. Materialize the order (id, status history, estimate)
//!     ├─ 4. Append to `orders` and clear `cart` in ONE transaction
//!     └─ 5. Refresh the in-memory view, emit CartUpdate
//! ```

use crate::catalog::{Catalog, area_delay_minutes, area_delivery_fee};
use crate::config::Config;
use crate::events::{EventPayload, StorageChange, Topic};
use crate::store::{Store, keys};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::models::{
    Address, AppliedPromo, CartItemInput, LineItem, MenuItem, Order, OrderDraft, OrderStatus,
    StatusChange,
};
use shared::util::{now_millis, order_id};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// A single checkout validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("One or more restaurants in your cart are no longer available")]
    RestaurantUnavailable { restaurant_id: String },

    #[error("{name} is currently closed")]
    RestaurantClosed { name: String },

    #[error("Minimum order for {name} is ₦{min_order}")]
    MinimumOrderNotMet {
        name: String,
        min_order: i64,
        subtotal: i64,
    },
}

/// Outcome of checkout validation; all applicable errors, in check order
#[derive(Debug, Clone, Default)]
pub struct CheckoutReport {
    pub errors: Vec<CheckoutError>,
}

impl CheckoutReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The message surfaced to the user: the first failure
    pub fn first_message(&self) -> Option<String> {
        self.errors.first().map(|e| e.to_string())
    }
}

/// Promo code rejection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoError {
    #[error("Invalid coupon code")]
    UnknownCode,

    #[error("Minimum order of ₦{min_spend} required")]
    MinSpendNotMet { min_spend: i64 },

    #[error("Coupon has expired")]
    Expired,
}

/// Cart operation errors
#[derive(Debug, Clone, Error)]
pub enum CartError {
    /// Checkout validation failed; carries the first failure
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("failed to persist order")]
    Persistence,
}

/// Cart summary for display surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSummary {
    pub item_count: u32,
    pub subtotal: i64,
    pub restaurant_count: usize,
    pub is_empty: bool,
    pub has_multiple_restaurants: bool,
}

/// Offline side-channel snapshot: the cart at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OfflineSnapshot {
    items: Vec<LineItem>,
    timestamp: i64,
}

/// Cart export for backup/hand-off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartExport {
    pub items: Vec<LineItem>,
    pub summary: CartSummary,
    pub timestamp: i64,
}

/// Shopping cart engine over a shared [`Store`].
///
/// Construct one per storefront handle; all engines sharing a store
/// converge through the cross-handle change feed.
pub struct CartEngine {
    store: Store,
    catalog: Catalog,
    config: Config,
    items: RwLock<Vec<LineItem>>,
    changes: Mutex<broadcast::Receiver<StorageChange>>,
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEngine")
            .field("items", &self.items.read().len())
            .finish()
    }
}

impl CartEngine {
    pub fn new(store: Store, config: Config) -> Self {
        let changes = Mutex::new(store.subscribe());
        let items = RwLock::new(store.cart_items());
        let catalog = Catalog::new(store.clone());
        Self {
            store,
            catalog,
            config,
            items,
            changes,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Drain the change feed and reload the cached view if the `cart`
    /// slot changed. Returns whether a reload happened.
    pub fn sync(&self) -> bool {
        let mut dirty = false;
        {
            let mut changes = self.changes.lock();
            loop {
                match changes.try_recv() {
                    Ok(change) => {
                        if change.key == keys::CART {
                            dirty = true;
                        }
                    }
                    // Missed notifications: the store is authoritative
                    Err(TryRecvError::Lagged(_)) => dirty = true,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        if dirty {
            self.reload();
        }
        dirty
    }

    /// Replace the cached view with the persisted cart
    pub fn reload(&self) {
        *self.items.write() = self.store.cart_items();
    }

    // ========== Views ==========

    pub fn items(&self) -> Vec<LineItem> {
        self.items.read().clone()
    }

    pub fn item_count(&self) -> u32 {
        self.items.read().iter().map(|item| item.quantity).sum()
    }

    /// Sum over all line items of effective unit price × quantity
    pub fn subtotal(&self) -> i64 {
        self.items.read().iter().map(LineItem::line_total).sum()
    }

    /// Subtotal plus delivery fee minus discount
    pub fn total(&self, delivery_fee: i64, discount: i64) -> i64 {
        self.subtotal() + delivery_fee - discount
    }

    /// Unique restaurant ids, in first-appearance order
    pub fn restaurant_ids(&self) -> Vec<String> {
        let items = self.items.read();
        let mut ids: Vec<String> = Vec::new();
        for item in items.iter() {
            if !ids.contains(&item.restaurant_id) {
                ids.push(item.restaurant_id.clone());
            }
        }
        ids
    }

    pub fn has_multiple_restaurants(&self) -> bool {
        self.restaurant_ids().len() > 1
    }

    /// Items grouped by restaurant, groups in first-appearance order
    pub fn items_by_restaurant(&self) -> Vec<(String, Vec<LineItem>)> {
        let items = self.items.read();
        let mut groups: Vec<(String, Vec<LineItem>)> = Vec::new();
        for item in items.iter() {
            match groups.iter_mut().find(|(id, _)| *id == item.restaurant_id) {
                Some((_, group)) => group.push(item.clone()),
                None => groups.push((item.restaurant_id.clone(), vec![item.clone()])),
            }
        }
        groups
    }

    pub fn summary(&self) -> CartSummary {
        let item_count = self.item_count();
        let restaurant_count = self.restaurant_ids().len();
        CartSummary {
            item_count,
            subtotal: self.subtotal(),
            restaurant_count,
            is_empty: item_count == 0,
            has_multiple_restaurants: restaurant_count > 1,
        }
    }

    // ========== Mutations ==========

    /// Add an item. An item with the same configuration (restaurant,
    /// item, add-on selection, special instructions) merges by summing
    /// quantity; otherwise the item is appended under a fresh identity
    /// stamp. Always persists and emits a `CartUpdate`.
    pub fn add_item(&self, input: CartItemInput) {
        {
            let mut items = self.items.write();
            let requested = input.timestamp;
            let mut candidate = input.into_line_item(0);

            match items
                .iter_mut()
                .find(|item| item.same_configuration(&candidate))
            {
                Some(existing) => existing.quantity += candidate.quantity,
                None => {
                    candidate.timestamp = unique_stamp(requested, &items);
                    items.push(candidate);
                }
            }
        }
        self.persist_and_emit();
    }

    /// Remove the item whose identity stamp matches; no-op when absent
    pub fn remove_item(&self, timestamp: i64) -> bool {
        let removed = {
            let mut items = self.items.write();
            let before = items.len();
            items.retain(|item| item.timestamp != timestamp);
            items.len() != before
        };
        if removed {
            self.persist_and_emit();
        }
        removed
    }

    /// Apply a quantity delta to the matching item; a resulting quantity
    /// of zero or less removes the item entirely
    pub fn update_quantity(&self, timestamp: i64, delta: i64) -> bool {
        let new_quantity = {
            let mut items = self.items.write();
            let Some(item) = items.iter_mut().find(|item| item.timestamp == timestamp) else {
                return false;
            };
            let new_quantity = i64::from(item.quantity) + delta;
            if new_quantity > 0 {
                item.quantity = new_quantity as u32;
            }
            new_quantity
        };
        if new_quantity <= 0 {
            return self.remove_item(timestamp);
        }
        self.persist_and_emit();
        true
    }

    /// Empty the cart and persist
    pub fn clear(&self) {
        self.items.write().clear();
        self.persist_and_emit();
    }

    fn persist_and_emit(&self) {
        let items = self.items.read().clone();
        if !self.store.set(keys::CART, &items) {
            tracing::warn!("Cart write failed; persisted cart is stale");
        }
        self.emit_cart_update(items);
    }

    fn emit_cart_update(&self, items: Vec<LineItem>) {
        let count = items.iter().map(|item| item.quantity).sum();
        let subtotal = items.iter().map(LineItem::line_total).sum();
        self.store.bus().emit(
            Topic::CartUpdate,
            &EventPayload::CartUpdate {
                items,
                count,
                subtotal,
            },
        );
    }

    // ========== Checkout ==========

    /// Gate run immediately before order creation. Collects every
    /// applicable failure; the first one is the user-facing message.
    pub fn validate_for_checkout(&self) -> CheckoutReport {
        let mut report = CheckoutReport::default();
        let items = self.items.read().clone();

        if items.is_empty() {
            report.errors.push(CheckoutError::EmptyCart);
            return report;
        }

        let restaurants = self.store.restaurants();

        for restaurant_id in self.restaurant_ids() {
            match restaurants.iter().find(|r| r.id == restaurant_id) {
                None => report.errors.push(CheckoutError::RestaurantUnavailable {
                    restaurant_id: restaurant_id.clone(),
                }),
                Some(restaurant) if !restaurant.is_open => {
                    report.errors.push(CheckoutError::RestaurantClosed {
                        name: restaurant.name.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for (restaurant_id, group) in self.items_by_restaurant() {
            let Some(restaurant) = restaurants.iter().find(|r| r.id == restaurant_id) else {
                continue;
            };
            let group_subtotal: i64 = group.iter().map(LineItem::line_total).sum();
            if group_subtotal < restaurant.min_order {
                report.errors.push(CheckoutError::MinimumOrderNotMet {
                    name: restaurant.name.clone(),
                    min_order: restaurant.min_order,
                    subtotal: group_subtotal,
                });
            }
        }

        report
    }

    /// Validate, price, and commit the cart as an immutable order.
    ///
    /// The `orders` append and the `cart` clear share one store
    /// transaction: an order is never observable with the cart still
    /// populated, and the cart is never cleared without its order.
    pub fn create_order(&self, draft: OrderDraft) -> Result<Order, CartError> {
        let report = self.validate_for_checkout();
        if let Some(first) = report.errors.first() {
            return Err(CartError::Checkout(first.clone()));
        }

        let items = self.items.read().clone();
        let subtotal: i64 = items.iter().map(LineItem::line_total).sum();
        let delivery_fee = self.delivery_fee(&draft.address);

        // Recompute the promo amount against the committed subtotal
        let promo = draft.promo.map(|promo| AppliedPromo {
            amount: discount_amount(subtotal, promo.percent),
            ..promo
        });
        let discount = promo.as_ref().map(|promo| promo.amount).unwrap_or(0);
        let total = subtotal + delivery_fee - discount;

        let now = now_millis();
        let order = Order {
            id: order_id(&self.config.order_prefix),
            user_id: draft.user_id,
            estimated_delivery: self.estimate_delivery(&draft.address.area, now),
            items,
            address: draft.address,
            schedule: draft.schedule,
            payment_method: draft.payment_method,
            delivery_notes: draft.delivery_notes,
            subtotal,
            delivery_fee,
            discount,
            total,
            promo,
            status: OrderStatus::Received,
            status_history: vec![StatusChange {
                status: OrderStatus::Received,
                timestamp: now,
            }],
            timestamp: now,
            updated_at: now,
        };

        let mut orders = self.store.orders();
        orders.push(order.clone());
        let orders_json = serde_json::to_value(&orders).map_err(|_| CartError::Persistence)?;

        if !self
            .store
            .set_many(&[(keys::ORDERS, orders_json), (keys::CART, json!([]))])
        {
            return Err(CartError::Persistence);
        }

        self.items.write().clear();
        self.emit_cart_update(Vec::new());

        tracing::info!(order_id = %order.id, total = order.total, "Order created");
        Ok(order)
    }

    /// Estimated delivery instant: now + base minutes + area offset +
    /// bounded random jitter
    fn estimate_delivery(&self, area: &str, now: i64) -> i64 {
        use rand::Rng;
        let mut minutes = self.config.base_delivery_minutes + area_delay_minutes(area);
        if self.config.delivery_jitter_minutes > 0 {
            minutes += rand::thread_rng().gen_range(0..self.config.delivery_jitter_minutes);
        }
        now + minutes * 60_000
    }

    /// Validate a promo code against a subtotal; the returned discount is
    /// floor(subtotal × percent / 100)
    pub fn apply_promo_code(&self, code: &str, subtotal: i64) -> Result<AppliedPromo, PromoError> {
        let coupon = self
            .catalog
            .coupon_by_code(code)
            .ok_or(PromoError::UnknownCode)?;
        if subtotal < coupon.min_spend {
            return Err(PromoError::MinSpendNotMet {
                min_spend: coupon.min_spend,
            });
        }
        if coupon.is_expired_at(now_millis()) {
            return Err(PromoError::Expired);
        }
        Ok(AppliedPromo {
            coupon_id: coupon.id,
            code: coupon.code,
            percent: coupon.discount,
            amount: discount_amount(subtotal, coupon.discount),
        })
    }

    /// Delivery fee for the whole cart: for each restaurant the larger
    /// of its flat fee and the area tier, then the maximum across
    /// restaurants. One delivery run must satisfy the costliest leg.
    pub fn delivery_fee(&self, address: &Address) -> i64 {
        let restaurants = self.store.restaurants();
        let area_fee = area_delivery_fee(&address.area);
        self.restaurant_ids()
            .iter()
            .filter_map(|id| restaurants.iter().find(|r| r.id == *id))
            .map(|restaurant| restaurant.delivery_fee.max(area_fee))
            .max()
            .unwrap_or(0)
    }

    // ========== Offline Snapshot ==========

    /// Snapshot the current items to the offline side slot
    pub fn save_for_offline(&self) -> bool {
        let snapshot = OfflineSnapshot {
            items: self.items.read().clone(),
            timestamp: now_millis(),
        };
        self.store.set(keys::OFFLINE_CART, &snapshot)
    }

    /// Restore the offline snapshot if it is fresh enough.
    ///
    /// Restoring replaces the current cart wholesale. A consumed
    /// snapshot is deleted; a stale one is left untouched and ignored.
    pub fn restore_from_offline(&self) -> bool {
        let Some(snapshot) = self.store.get::<OfflineSnapshot>(keys::OFFLINE_CART) else {
            return false;
        };
        let age_hours = (now_millis() - snapshot.timestamp) / 3_600_000;
        if age_hours >= self.config.offline_max_age_hours {
            return false;
        }
        *self.items.write() = snapshot.items;
        self.persist_and_emit();
        self.store.remove(keys::OFFLINE_CART);
        true
    }

    // ========== Extras ==========

    /// Menu items from the cart's restaurants that are not yet in the
    /// cart, up to `limit`
    pub fn recommended_items(&self, limit: usize) -> Vec<(String, MenuItem)> {
        let items = self.items.read().clone();
        let mut recommendations = Vec::new();
        for restaurant_id in self.restaurant_ids() {
            for (_, menu_items) in self.catalog.restaurant_menu(&restaurant_id) {
                for menu_item in menu_items {
                    let in_cart = items.iter().any(|item| {
                        item.restaurant_id == restaurant_id && item.item_id == menu_item.id
                    });
                    if !in_cart && recommendations.len() < limit {
                        recommendations.push((restaurant_id.clone(), menu_item));
                    }
                }
            }
        }
        recommendations
    }

    /// Snapshot the cart for backup/hand-off
    pub fn export_cart(&self) -> CartExport {
        CartExport {
            items: self.items(),
            summary: self.summary(),
            timestamp: now_millis(),
        }
    }

    /// Replace the cart with an exported snapshot, persist, and emit
    pub fn import_cart(&self, export: &CartExport) -> bool {
        *self.items.write() = export.items.clone();
        self.persist_and_emit();
        true
    }
}

/// floor(subtotal × percent / 100) in minor units
fn discount_amount(subtotal: i64, percent: u32) -> i64 {
    subtotal * i64::from(percent) / 100
}

/// Pick an identity stamp not taken by any existing item: the requested
/// stamp (or the current instant), bumped past collisions
fn unique_stamp(requested: Option<i64>, items: &[LineItem]) -> i64 {
    let mut stamp = requested.unwrap_or_else(now_millis);
    while items.iter().any(|item| item.timestamp == stamp) {
        stamp += 1;
    }
    stamp
}
