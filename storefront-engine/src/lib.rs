//! Storefront State Engine
//!
//! Local transactional state layer for a client-side food-ordering
//! storefront: a persistent key-value store, a publish/subscribe change
//! model, and the shopping-cart/order engine built on top of them.
//! Rendering, admin screens and navigation are external consumers of
//! this crate's contract.
//!
//! # Module structure
//!
//! ```text
//! storefront-engine/src/
//! ├── config/        # Env-backed configuration
//! ├── store/         # redb-backed persistent key-value store
//! ├── events/        # In-process bus + cross-handle change feed
//! ├── cart/          # Cart engine: dedup, pricing, checkout, offline
//! ├── catalog/       # Read-only catalog and pricing queries
//! ├── orders/        # Order directory: status machine, admin queries
//! └── utils/         # Logging setup
//! ```
//!
//! # Lifecycle
//!
//! Open one [`Store`] at startup and pass it (it is cheaply cloneable and
//! shares the database and event channels) to every collaborator.
//! Construct one [`CartEngine`] per storefront handle; engines sharing a
//! store converge through the change feed.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod events;
pub mod orders;
pub mod store;
pub mod utils;

// Re-export public types
pub use cart::{CartEngine, CartError, CartSummary, CheckoutError, CheckoutReport, PromoError};
pub use catalog::{Catalog, RestaurantFilters};
pub use config::Config;
pub use events::{EventBus, EventPayload, ListenerId, StorageChange, Topic};
pub use orders::{OrderDirectory, OrderError};
pub use store::{Store, StoreError, StoreResult, keys};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
