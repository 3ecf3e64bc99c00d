//! User Model
//!
//! There is no real authentication in this system: "login" is a local
//! flag, and the current user is a store slot.

use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: i64,
}

impl super::HasId for User {
    fn id(&self) -> &str {
        &self.id
    }
}
