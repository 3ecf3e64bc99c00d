//! Restaurant Model

use chrono::{Datelike, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Opening hours per weekday, as `"HH:MM - HH:MM"` strings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpeningHours {
    pub mon: String,
    pub tue: String,
    pub wed: String,
    pub thu: String,
    pub fri: String,
    pub sat: String,
    pub sun: String,
}

impl OpeningHours {
    /// The raw hours string for a weekday
    pub fn for_weekday(&self, weekday: Weekday) -> &str {
        match weekday {
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
            Weekday::Sun => &self.sun,
        }
    }
}

/// Restaurant catalog entity
///
/// Read-only from the cart engine's perspective; mutated only by admin
/// collaborators through the store contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub area: String,
    pub description: String,
    pub image: Option<String>,
    pub logo: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cuisines: Vec<String>,
    pub rating: f64,
    pub reviews: u32,
    /// Typical delivery time in minutes
    pub delivery_time: u32,
    /// Flat delivery fee in minor units
    pub delivery_fee: i64,
    /// Minimum order subtotal in minor units
    pub min_order: i64,
    pub is_open: bool,
    /// "budget" | "moderate" | "premium"
    pub price_range: String,
    pub hours: OpeningHours,
}

impl Restaurant {
    /// Whether the given instant falls inside the posted opening hours.
    ///
    /// Hours strings that fail to parse are treated as closed. This is a
    /// display/advisory helper; checkout validation gates on `is_open`.
    pub fn is_open_at(&self, instant_millis: i64) -> bool {
        let Some(at) = Utc.timestamp_millis_opt(instant_millis).single() else {
            return false;
        };
        let Some((open, close)) = parse_hours(self.hours.for_weekday(at.weekday())) else {
            return false;
        };
        let time = at.time();
        time >= open && time <= close
    }
}

impl super::HasId for Restaurant {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Parse a `"HH:MM - HH:MM"` range
fn parse_hours(range: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (open, close) = range.split_once('-')?;
    let open = NaiveTime::parse_from_str(open.trim(), "%H:%M").ok()?;
    let close = NaiveTime::parse_from_str(close.trim(), "%H:%M").ok()?;
    Some((open, close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn restaurant_open_nine_to_five() -> Restaurant {
        Restaurant {
            id: "rest_001".into(),
            name: "Test Kitchen".into(),
            area: "Effurun".into(),
            description: String::new(),
            image: None,
            logo: None,
            phone: None,
            address: None,
            cuisines: vec!["Nigerian".into()],
            rating: 4.5,
            reviews: 10,
            delivery_time: 30,
            delivery_fee: 300,
            min_order: 1500,
            is_open: true,
            price_range: "moderate".into(),
            hours: OpeningHours {
                mon: "09:00 - 17:00".into(),
                tue: "09:00 - 17:00".into(),
                wed: "09:00 - 17:00".into(),
                thu: "09:00 - 17:00".into(),
                fri: "09:00 - 17:00".into(),
                sat: "09:00 - 17:00".into(),
                sun: "09:00 - 17:00".into(),
            },
        }
    }

    #[test]
    fn test_open_within_hours() {
        let r = restaurant_open_nine_to_five();
        let noon = Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap();
        assert!(r.is_open_at(noon.timestamp_millis()));
    }

    #[test]
    fn test_closed_outside_hours() {
        let r = restaurant_open_nine_to_five();
        let late = Utc.with_ymd_and_hms(2025, 3, 3, 22, 0, 0).unwrap();
        assert!(!r.is_open_at(late.timestamp_millis()));
    }

    #[test]
    fn test_unparseable_hours_treated_as_closed() {
        let mut r = restaurant_open_nine_to_five();
        r.hours.mon = "all day".into();
        let noon = Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap();
        assert!(!r.is_open_at(noon.timestamp_millis()));
    }
}
