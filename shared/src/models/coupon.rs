//! Coupon Model

use serde::{Deserialize, Serialize};

/// Coupon catalog entity
///
/// Codes are matched case-insensitively. Read-only from the cart engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    /// Percentage discount (e.g. 10 = 10%)
    pub discount: u32,
    /// Minimum cart subtotal in minor units
    pub min_spend: i64,
    /// Expiry instant (UTC millis)
    pub expiry: i64,
    pub usage_count: u32,
}

impl Coupon {
    /// Whether the coupon is expired at the given instant
    pub fn is_expired_at(&self, instant_millis: i64) -> bool {
        instant_millis > self.expiry
    }
}

impl super::HasId for Coupon {
    fn id(&self) -> &str {
        &self.id
    }
}
