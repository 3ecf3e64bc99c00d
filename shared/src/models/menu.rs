//! Menu Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Menus for all restaurants: restaurant id → category name → items
pub type MenuMap = BTreeMap<String, BTreeMap<String, Vec<MenuItem>>>;

/// How many options of an add-on group may be selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Single choice (radio)
    Exclusive,
    /// Any number of choices (checkbox)
    Multiple,
}

/// One selectable option inside an add-on group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnOption {
    pub name: String,
    /// Price contribution in minor units (0 for included options)
    pub price: i64,
}

/// A named set of selectable options attached to a menu item
/// (e.g. "Protein", "Extras")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnGroup {
    pub name: String,
    pub selection: SelectionMode,
    pub required: bool,
    pub options: Vec<AddOnOption>,
}

/// Menu item catalog entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Base price in minor units, before add-ons
    pub price: i64,
    pub image: Option<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub add_ons: Vec<AddOnGroup>,
}

impl super::HasId for MenuItem {
    fn id(&self) -> &str {
        &self.id
    }
}
