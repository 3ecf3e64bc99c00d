//! Catalog and pricing queries
//!
//! Read-only views over the store's catalog slots, consumed by the cart
//! engine during validation and pricing. These never mutate state.

use crate::store::Store;
use shared::models::{Coupon, MenuItem, Restaurant};
use std::collections::BTreeMap;

/// Delivery fee tiers by area, in minor units
const DELIVERY_FEE_TIERS: &[(&str, i64)] = &[
    ("Effurun", 300),
    ("Enerhen", 400),
    ("PTI Road", 500),
    ("Jakpa Road", 600),
    ("Airport Road", 700),
    ("Ekpan", 800),
    ("Ugbuwangue", 900),
    ("Ugborikoko", 1000),
];

/// Fee for areas outside the tier table
const DEFAULT_AREA_FEE: i64 = 500;

/// Extra delivery minutes by area, added to the base estimate
const AREA_DELAY_MINUTES: &[(&str, i64)] = &[
    ("Effurun", 0),
    ("Enerhen", 5),
    ("PTI Road", 10),
    ("Jakpa Road", 15),
    ("Airport Road", 20),
    ("Ekpan", 25),
    ("Ugbuwangue", 30),
    ("Ugborikoko", 35),
];

/// Offset for areas outside the delay table
const DEFAULT_AREA_DELAY: i64 = 15;

/// Area-tiered delivery fee; unknown areas get the default tier
pub fn area_delivery_fee(area: &str) -> i64 {
    DELIVERY_FEE_TIERS
        .iter()
        .find(|(tier_area, _)| *tier_area == area)
        .map(|(_, fee)| *fee)
        .unwrap_or(DEFAULT_AREA_FEE)
}

/// Area-dependent delivery-time offset in minutes
pub fn area_delay_minutes(area: &str) -> i64 {
    AREA_DELAY_MINUTES
        .iter()
        .find(|(delay_area, _)| *delay_area == area)
        .map(|(_, minutes)| *minutes)
        .unwrap_or(DEFAULT_AREA_DELAY)
}

/// Restaurant search filters; empty fields do not constrain
#[derive(Debug, Clone, Default)]
pub struct RestaurantFilters {
    pub areas: Vec<String>,
    pub max_delivery_time: Option<u32>,
    pub price_ranges: Vec<String>,
    /// Restaurant passes when its rating meets any of these minimums
    pub min_ratings: Vec<f64>,
    pub cuisine: Option<String>,
}

/// A menu search match, with the category the item was found under
#[derive(Debug, Clone)]
pub struct MenuSearchHit {
    pub category: String,
    pub item: MenuItem,
}

/// Read-only catalog view over a [`Store`]
#[derive(Debug, Clone)]
pub struct Catalog {
    store: Store,
}

impl Catalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Restaurant lookup by id
    pub fn restaurant(&self, id: &str) -> Option<Restaurant> {
        self.store.restaurants().into_iter().find(|r| r.id == id)
    }

    /// Menu for a restaurant: category name → items
    pub fn restaurant_menu(&self, restaurant_id: &str) -> BTreeMap<String, Vec<MenuItem>> {
        self.store
            .menus()
            .remove(restaurant_id)
            .unwrap_or_default()
    }

    /// Coupon lookup by case-insensitive code
    pub fn coupon_by_code(&self, code: &str) -> Option<Coupon> {
        self.store
            .coupons()
            .into_iter()
            .find(|coupon| coupon.code.eq_ignore_ascii_case(code))
    }

    /// Text search over name, cuisines and area, then filter
    pub fn search_restaurants(
        &self,
        query: Option<&str>,
        filters: &RestaurantFilters,
    ) -> Vec<Restaurant> {
        self.store
            .restaurants()
            .into_iter()
            .filter(|restaurant| {
                if let Some(query) = query {
                    let needle = query.to_lowercase();
                    let matches_text = restaurant.name.to_lowercase().contains(&needle)
                        || restaurant
                            .cuisines
                            .iter()
                            .any(|cuisine| cuisine.to_lowercase().contains(&needle))
                        || restaurant.area.to_lowercase().contains(&needle);
                    if !matches_text {
                        return false;
                    }
                }
                if !filters.areas.is_empty() && !filters.areas.contains(&restaurant.area) {
                    return false;
                }
                if let Some(max) = filters.max_delivery_time
                    && restaurant.delivery_time > max
                {
                    return false;
                }
                if !filters.price_ranges.is_empty()
                    && !filters.price_ranges.contains(&restaurant.price_range)
                {
                    return false;
                }
                if !filters.min_ratings.is_empty()
                    && !filters
                        .min_ratings
                        .iter()
                        .any(|min| restaurant.rating >= *min)
                {
                    return false;
                }
                if let Some(cuisine) = &filters.cuisine
                    && !restaurant
                        .cuisines
                        .iter()
                        .any(|c| c.eq_ignore_ascii_case(cuisine))
                {
                    return false;
                }
                true
            })
            .collect()
    }

    /// Search a restaurant's menu items by name or description
    pub fn search_menu_items(&self, restaurant_id: &str, query: &str) -> Vec<MenuSearchHit> {
        let needle = query.to_lowercase();
        let mut hits = Vec::new();
        for (category, items) in self.restaurant_menu(restaurant_id) {
            for item in items {
                if item.name.to_lowercase().contains(&needle)
                    || item.description.to_lowercase().contains(&needle)
                {
                    hits.push(MenuSearchHit {
                        category: category.clone(),
                        item,
                    });
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;
    use shared::models::{AddOnGroup, AddOnOption, OpeningHours, SelectionMode};

    fn sample_restaurant(id: &str, name: &str, area: &str) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: name.to_string(),
            area: area.to_string(),
            description: String::new(),
            image: None,
            logo: None,
            phone: None,
            address: None,
            cuisines: vec!["Nigerian".into()],
            rating: 4.5,
            reviews: 20,
            delivery_time: 30,
            delivery_fee: 300,
            min_order: 1500,
            is_open: true,
            price_range: "moderate".into(),
            hours: OpeningHours::default(),
        }
    }

    fn catalog_with_restaurants() -> Catalog {
        let store = Store::open_in_memory().unwrap();
        let restaurants = vec![
            sample_restaurant("rest_001", "Mama Cass Kitchen", "Effurun"),
            sample_restaurant("rest_002", "Golden Dragon", "Enerhen"),
        ];
        assert!(store.set(keys::RESTAURANTS, &restaurants));
        Catalog::new(store)
    }

    #[test]
    fn test_area_fee_tiers_and_default() {
        assert_eq!(area_delivery_fee("Effurun"), 300);
        assert_eq!(area_delivery_fee("Ugborikoko"), 1000);
        assert_eq!(area_delivery_fee("Nowhere"), 500);
    }

    #[test]
    fn test_area_delay_and_default() {
        assert_eq!(area_delay_minutes("Effurun"), 0);
        assert_eq!(area_delay_minutes("Ekpan"), 25);
        assert_eq!(area_delay_minutes("Nowhere"), 15);
    }

    #[test]
    fn test_restaurant_lookup() {
        let catalog = catalog_with_restaurants();
        assert_eq!(catalog.restaurant("rest_002").unwrap().area, "Enerhen");
        assert!(catalog.restaurant("rest_999").is_none());
    }

    #[test]
    fn test_coupon_code_is_case_insensitive() {
        let store = Store::open_in_memory().unwrap();
        let coupons = vec![Coupon {
            id: "coupon_001".into(),
            code: "WELCOME10".into(),
            description: None,
            discount: 10,
            min_spend: 1000,
            expiry: i64::MAX,
            usage_count: 0,
        }];
        assert!(store.set(keys::COUPONS, &coupons));
        let catalog = Catalog::new(store);

        assert!(catalog.coupon_by_code("welcome10").is_some());
        assert!(catalog.coupon_by_code("Welcome10").is_some());
        assert!(catalog.coupon_by_code("NOPE").is_none());
    }

    #[test]
    fn test_search_by_text_and_area_filter() {
        let catalog = catalog_with_restaurants();

        let hits = catalog.search_restaurants(Some("dragon"), &RestaurantFilters::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "rest_002");

        let filters = RestaurantFilters {
            areas: vec!["Effurun".into()],
            ..Default::default()
        };
        let hits = catalog.search_restaurants(None, &filters);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "rest_001");
    }

    #[test]
    fn test_search_menu_items_matches_name_and_description() {
        let store = Store::open_in_memory().unwrap();
        let menus: shared::models::MenuMap = [(
            "rest_001".to_string(),
            [(
                "Rice Dishes".to_string(),
                vec![
                    MenuItem {
                        id: "item_001".into(),
                        name: "Jollof Rice".into(),
                        description: "Smoky party-style jollof".into(),
                        price: 2500,
                        image: None,
                        popular: true,
                        add_ons: vec![AddOnGroup {
                            name: "Protein".into(),
                            selection: SelectionMode::Exclusive,
                            required: true,
                            options: vec![
                                AddOnOption {
                                    name: "Chicken".into(),
                                    price: 0,
                                },
                                AddOnOption {
                                    name: "Beef".into(),
                                    price: 500,
                                },
                            ],
                        }],
                    },
                    MenuItem {
                        id: "item_002".into(),
                        name: "Fried Rice".into(),
                        description: "With mixed vegetables".into(),
                        price: 2500,
                        image: None,
                        popular: false,
                        add_ons: vec![],
                    },
                ],
            )]
            .into_iter()
            .collect(),
        )]
        .into_iter()
        .collect();
        assert!(store.set(keys::MENUS, &menus));
        let catalog = Catalog::new(store);

        let hits = catalog.search_menu_items("rest_001", "jollof");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, "item_001");
        assert_eq!(hits[0].category, "Rice Dishes");
        assert_eq!(hits[0].item.add_ons[0].selection, SelectionMode::Exclusive);

        let hits = catalog.search_menu_items("rest_001", "vegetables");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, "item_002");
    }
}
