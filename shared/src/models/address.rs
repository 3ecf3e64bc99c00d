//! Delivery Address Model

use serde::{Deserialize, Serialize};

/// Saved delivery address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    pub user_id: Option<String>,
    /// Display label, e.g. "Home", "Office"
    pub label: String,
    /// Delivery area; drives fee tiers and delivery-time offsets
    pub area: String,
    pub street: String,
    pub directions: Option<String>,
}

impl super::HasId for Address {
    fn id(&self) -> &str {
        &self.id
    }
}
