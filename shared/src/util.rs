/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a resource ID: prefix + creation millis + 3 random digits.
///
/// Collision-free at single-store scale; the random suffix disambiguates
/// ids minted within the same millisecond.
pub fn resource_id(prefix: &str) -> String {
    use rand::Rng;
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{}{}{:03}", prefix, now_millis(), suffix)
}

/// Generate an order ID: prefix + last 6 digits of creation millis +
/// 3-digit zero-padded random suffix.
pub fn order_id(prefix: &str) -> String {
    use rand::Rng;
    let millis = now_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{}{}{:03}", prefix, tail, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_format() {
        let id = order_id("FPW");
        assert!(id.starts_with("FPW"));
        assert_eq!(id.len(), 3 + 6 + 3);
        assert!(id[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_resource_id_prefix() {
        let id = resource_id("addr_");
        assert!(id.starts_with("addr_"));
        assert!(id[5..].chars().all(|c| c.is_ascii_digit()));
    }
}
