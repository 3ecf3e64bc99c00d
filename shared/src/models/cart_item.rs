//! Cart Line Item Model

use super::menu::AddOnOption;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selected add-ons for a line item: group name → chosen options.
///
/// A `BTreeMap` keeps group ordering canonical; option order within a
/// group is as selected and is normalized only for comparison.
pub type SelectedAddOns = BTreeMap<String, Vec<AddOnOption>>;

/// One configured product instance in a cart.
///
/// `timestamp` is the item's identity key within the cart: unique per
/// item, assigned by the cart engine at insertion, and the only handle
/// external callers use to address the item afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub restaurant_id: String,
    /// Denormalized for display
    pub restaurant_name: String,
    pub item_id: String,
    pub name: String,
    /// Base unit price in minor units, before add-ons
    pub price: i64,
    pub quantity: u32,
    #[serde(default)]
    pub add_ons: SelectedAddOns,
    #[serde(default)]
    pub special_instructions: String,
    pub image: Option<String>,
    /// Creation instant (UTC millis); identity key within the cart
    pub timestamp: i64,
}

impl LineItem {
    /// Sum of all selected add-on option prices, in minor units.
    ///
    /// Each selected option contributes its own price once; groups
    /// combine additively.
    pub fn add_on_total(&self) -> i64 {
        self.add_ons
            .values()
            .flat_map(|options| options.iter())
            .map(|option| option.price)
            .sum()
    }

    /// Effective unit price: base price + selected add-ons
    pub fn unit_price(&self) -> i64 {
        self.price + self.add_on_total()
    }

    /// Line total: effective unit price × quantity
    pub fn line_total(&self) -> i64 {
        self.unit_price() * i64::from(self.quantity)
    }

    /// Whether two items are the same cart entry for merge purposes:
    /// same restaurant, item, special instructions, and add-on selection.
    ///
    /// Add-on equality is structural over option *names*, independent of
    /// group and option ordering. Prices are carried data, not identity.
    pub fn same_configuration(&self, other: &LineItem) -> bool {
        self.restaurant_id == other.restaurant_id
            && self.item_id == other.item_id
            && self.special_instructions == other.special_instructions
            && same_add_ons(&self.add_ons, &other.add_ons)
    }
}

/// Payload for adding an item to the cart.
///
/// The cart engine owns line-item identity: a supplied `timestamp` is
/// honored when free, otherwise the engine stamps the current instant
/// (bumped past any collision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemInput {
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub item_id: String,
    pub name: String,
    /// Base unit price in minor units
    pub price: i64,
    pub quantity: u32,
    #[serde(default)]
    pub add_ons: SelectedAddOns,
    #[serde(default)]
    pub special_instructions: String,
    pub image: Option<String>,
    pub timestamp: Option<i64>,
}

impl CartItemInput {
    /// Materialize a line item with the given identity stamp
    pub fn into_line_item(self, timestamp: i64) -> LineItem {
        LineItem {
            restaurant_id: self.restaurant_id,
            restaurant_name: self.restaurant_name,
            item_id: self.item_id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            add_ons: self.add_ons,
            special_instructions: self.special_instructions,
            image: self.image,
            timestamp,
        }
    }
}

fn same_add_ons(a: &SelectedAddOns, b: &SelectedAddOns) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // BTreeMap iteration is already ordered by group name
    a.iter().zip(b.iter()).all(|((ga, opts_a), (gb, opts_b))| {
        ga == gb && sorted_names(opts_a) == sorted_names(opts_b)
    })
}

fn sorted_names(options: &[AddOnOption]) -> Vec<&str> {
    let mut names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
    names.sort_unstable();
    names
}
