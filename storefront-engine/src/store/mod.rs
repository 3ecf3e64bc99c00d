//! redb-based persistent key-value store
//!
//! # Layout
//!
//! One `slots` table: key = well-known slot name (see [`keys`]), value =
//! JSON-serialized slot content. Every persistence key of the storefront
//! (catalog lists, cart, orders, session state) is a top-level slot.
//!
//! # Contract
//!
//! The public surface degrades instead of throwing: reads return `None`
//! on absence *or* corruption (logged), writes return `false` on failure
//! with prior state intact. Internals use [`StoreResult`] and `?`.
//!
//! Every successful write or removal emits exactly one change
//! notification on both channels: the in-process [`EventBus`] and the
//! cross-handle broadcast feed. Writes are last-write-wins at slot
//! granularity; there is no cross-handle locking.

use crate::events::{EventBus, EventPayload, StorageChange, Topic};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use shared::models::{Address, Coupon, HasId, LineItem, MenuMap, Order, Restaurant, User};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Table for all slots: key = slot name, value = JSON-serialized content
const SLOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("slots");

/// Cross-handle change feed capacity
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Well-known slot names
pub mod keys {
    pub const RESTAURANTS: &str = "restaurants";
    pub const MENUS: &str = "menus";
    pub const COUPONS: &str = "coupons";
    pub const USERS: &str = "users";
    pub const ADDRESSES: &str = "addresses";
    pub const ORDERS: &str = "orders";
    pub const CART: &str = "cart";
    pub const CURRENT_USER: &str = "current_user";
    pub const SESSION: &str = "session";
    pub const ADMIN_LOGGED_IN: &str = "admin_logged_in";
    /// Side slot written by the cart engine's offline snapshot
    pub const OFFLINE_CART: &str = "offline_cart";
}

/// Slots seeded on first open, and exported by `export_data`
const EXPORT_KEYS: &[&str] = &[
    keys::RESTAURANTS,
    keys::MENUS,
    keys::COUPONS,
    keys::USERS,
    keys::ADDRESSES,
    keys::ORDERS,
    keys::CART,
    keys::CURRENT_USER,
];

/// Store errors (internal; the public contract degrades per module docs)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent store shared by every storefront component.
///
/// Constructed once at startup and passed by reference to collaborators;
/// cloning shares the same database and event channels.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    bus: Arc<EventBus>,
    change_tx: broadcast::Sender<StorageChange>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("db", &"<Database>").finish()
    }
}

fn default_slots() -> Vec<(&'static str, Value)> {
    vec![
        (keys::RESTAURANTS, json!([])),
        (keys::MENUS, json!({})),
        (keys::COUPONS, json!([])),
        (keys::USERS, json!([])),
        (keys::ADDRESSES, json!([])),
        (keys::ORDERS, json!([])),
        (keys::CART, json!([])),
        (keys::CURRENT_USER, Value::Null),
        (keys::SESSION, Value::Null),
        (keys::ADMIN_LOGGED_IN, json!(false)),
    ]
}

impl Store {
    /// Open or create the database at the given path and seed defaults.
    ///
    /// Seeding writes a slot only when it is currently absent; existing
    /// data is never overwritten on open.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        let store = Self::from_db(db);
        store.init_defaults()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self::from_db(db);
        store.init_defaults()?;
        Ok(store)
    }

    fn from_db(db: Database) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db: Arc::new(db),
            bus: Arc::new(EventBus::new()),
            change_tx,
        }
    }

    /// The in-process event bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Subscribe to the cross-handle change feed
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.change_tx.subscribe()
    }

    fn init_defaults(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SLOTS_TABLE)?;
            for (key, value) in default_slots() {
                if table.get(key)?.is_none() {
                    let bytes = serde_json::to_vec(&value)?;
                    table.insert(key, bytes.as_slice())?;
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Primitive Operations ==========

    fn read_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;
        Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
    }

    fn write_raw(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SLOTS_TABLE)?;
            table.insert(key, bytes)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn emit_change(&self, key: &str, value: Option<Value>) {
        self.bus.emit(
            Topic::StorageUpdate,
            &EventPayload::StorageUpdate {
                key: key.to_string(),
                value: value.clone(),
            },
        );
        // No receivers is fine; handles come and go
        let _ = self.change_tx.send(StorageChange {
            key: key.to_string(),
            value,
        });
    }

    /// Read and deserialize a slot.
    ///
    /// Returns `None` when the slot is absent or its content cannot be
    /// deserialized; corruption is logged, never raised.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.read_raw(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to read slot");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to deserialize slot");
                None
            }
        }
    }

    /// Serialize and write a slot; emits one change notification on
    /// success. Returns `false` on failure with prior state intact.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to serialize slot");
                return false;
            }
        };
        let bytes = match serde_json::to_vec(&json) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to serialize slot");
                return false;
            }
        };
        if let Err(e) = self.write_raw(key, &bytes) {
            tracing::error!(key = %key, error = %e, "Failed to write slot");
            return false;
        }
        self.emit_change(key, Some(json));
        true
    }

    /// Delete a slot; emits a change notification with a null value
    pub fn remove(&self, key: &str) -> bool {
        let result: StoreResult<()> = (|| {
            let txn = self.db.begin_write()?;
            {
                let mut table = txn.open_table(SLOTS_TABLE)?;
                table.remove(key)?;
            }
            txn.commit()?;
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.emit_change(key, None);
                true
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to remove slot");
                false
            }
        }
    }

    /// Write several slots in one transaction; all or nothing.
    ///
    /// This is the atomic-commit primitive: order creation appends to
    /// `orders` and clears `cart` through a single call so neither write
    /// can be observed without the other. Change notifications (one per
    /// slot) fire after the commit.
    pub fn set_many(&self, entries: &[(&str, Value)]) -> bool {
        let result: StoreResult<()> = (|| {
            let txn = self.db.begin_write()?;
            {
                let mut table = txn.open_table(SLOTS_TABLE)?;
                for (key, value) in entries {
                    let bytes = serde_json::to_vec(value)?;
                    table.insert(*key, bytes.as_slice())?;
                }
            }
            txn.commit()?;
            Ok(())
        })();
        match result {
            Ok(()) => {
                for (key, value) in entries {
                    self.emit_change(key, Some(value.clone()));
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed multi-slot write");
                false
            }
        }
    }

    // ========== List Operations ==========
    //
    // Lists are JSON arrays of objects carrying an `"id"` field. These
    // helpers exist for admin collaborators that patch catalog entries
    // in place; the cart engine rewrites whole slots instead.

    /// Append an element to the array at `key`
    pub fn push_to_list(&self, key: &str, item: Value) -> bool {
        let mut list: Vec<Value> = self.get(key).unwrap_or_default();
        list.push(item);
        self.set(key, &list)
    }

    /// Shallow-merge `patch` into the element whose id matches; patch
    /// fields win on conflict. Returns `false` when the id is absent.
    pub fn update_in_list(&self, key: &str, id: &str, patch: &Map<String, Value>) -> bool {
        let mut list: Vec<Value> = self.get(key).unwrap_or_default();
        let Some(entry) = list
            .iter_mut()
            .find(|entry| entry.get("id").and_then(Value::as_str) == Some(id))
        else {
            return false;
        };
        let Some(fields) = entry.as_object_mut() else {
            return false;
        };
        for (field, value) in patch {
            fields.insert(field.clone(), value.clone());
        }
        self.set(key, &list)
    }

    /// Filter out the element whose id matches and write back.
    /// Removing a non-existent id is a no-op success.
    pub fn remove_from_list(&self, key: &str, id: &str) -> bool {
        let mut list: Vec<Value> = self.get(key).unwrap_or_default();
        list.retain(|entry| entry.get("id").and_then(Value::as_str) != Some(id));
        self.set(key, &list)
    }

    /// Replace the element with the same id, or append when absent
    pub fn upsert_by_id<T>(&self, key: &str, item: T) -> bool
    where
        T: Serialize + DeserializeOwned + HasId,
    {
        let mut list: Vec<T> = self.get(key).unwrap_or_default();
        match list.iter_mut().find(|entry| entry.id() == item.id()) {
            Some(entry) => *entry = item,
            None => list.push(item),
        }
        self.set(key, &list)
    }

    /// Find an element by id (read-only)
    pub fn find_in_list(&self, key: &str, id: &str) -> Option<Value> {
        let list: Vec<Value> = self.get(key)?;
        list.into_iter()
            .find(|entry| entry.get("id").and_then(Value::as_str) == Some(id))
    }

    /// Filter elements by predicate (read-only)
    pub fn filter_list<F>(&self, key: &str, predicate: F) -> Vec<Value>
    where
        F: Fn(&Value) -> bool,
    {
        let list: Vec<Value> = self.get(key).unwrap_or_default();
        list.into_iter().filter(|entry| predicate(entry)).collect()
    }

    // ========== Typed Slot Accessors ==========

    pub fn restaurants(&self) -> Vec<Restaurant> {
        self.get(keys::RESTAURANTS).unwrap_or_default()
    }

    pub fn menus(&self) -> MenuMap {
        self.get(keys::MENUS).unwrap_or_default()
    }

    pub fn coupons(&self) -> Vec<Coupon> {
        self.get(keys::COUPONS).unwrap_or_default()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.get(keys::ORDERS).unwrap_or_default()
    }

    pub fn cart_items(&self) -> Vec<LineItem> {
        self.get(keys::CART).unwrap_or_default()
    }

    pub fn users(&self) -> Vec<User> {
        self.get(keys::USERS).unwrap_or_default()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.get(keys::ADDRESSES).unwrap_or_default()
    }

    // ========== Session Helpers ==========

    pub fn current_user(&self) -> Option<User> {
        self.get::<Option<User>>(keys::CURRENT_USER).flatten()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn set_current_user(&self, user: Option<&User>) -> bool {
        self.set(keys::CURRENT_USER, &user)
    }

    pub fn is_admin_logged_in(&self) -> bool {
        self.get(keys::ADMIN_LOGGED_IN).unwrap_or(false)
    }

    pub fn set_admin_logged_in(&self, logged_in: bool) -> bool {
        self.set(keys::ADMIN_LOGGED_IN, &logged_in)
    }

    /// Addresses for the given user, or the current user when `None`
    pub fn user_addresses(&self, user_id: Option<&str>) -> Vec<Address> {
        let Some(user_id) = user_id
            .map(str::to_string)
            .or_else(|| self.current_user().map(|u| u.id))
        else {
            return Vec::new();
        };
        self.addresses()
            .into_iter()
            .filter(|addr| addr.user_id.as_deref() == Some(user_id.as_str()))
            .collect()
    }

    /// Orders for the given user, or the current user when `None`
    pub fn user_orders(&self, user_id: Option<&str>) -> Vec<Order> {
        let Some(user_id) = user_id
            .map(str::to_string)
            .or_else(|| self.current_user().map(|u| u.id))
        else {
            return Vec::new();
        };
        self.orders()
            .into_iter()
            .filter(|order| order.user_id.as_deref() == Some(user_id.as_str()))
            .collect()
    }

    // ========== Maintenance ==========

    /// Drop every slot and re-seed defaults (demo reset).
    ///
    /// Re-seeding emits the usual per-slot change notifications, followed
    /// by one `StorageClear` event on the bus.
    pub fn reset(&self) -> bool {
        let result: StoreResult<()> = (|| {
            let txn = self.db.begin_write()?;
            {
                let mut table = txn.open_table(SLOTS_TABLE)?;
                let slots: Vec<String> = table
                    .iter()?
                    .filter_map(|entry| entry.ok())
                    .map(|(key, _)| key.value().to_string())
                    .collect();
                for key in &slots {
                    table.remove(key.as_str())?;
                }
            }
            txn.commit()?;
            Ok(())
        })();
        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to clear store");
            return false;
        }
        for (key, value) in default_slots() {
            if !self.set(key, &value) {
                return false;
            }
        }
        self.bus.emit(Topic::StorageClear, &EventPayload::StorageClear);
        true
    }

    /// Snapshot the user-facing slots (for backup/debugging)
    pub fn export_data(&self) -> BTreeMap<String, Value> {
        EXPORT_KEYS
            .iter()
            .map(|key| {
                (
                    (*key).to_string(),
                    self.get::<Value>(key).unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    /// Write every entry of a snapshot back (for restore/seeding)
    pub fn import_data(&self, data: &BTreeMap<String, Value>) -> bool {
        data.iter().all(|(key, value)| self.set(key, value))
    }
}
