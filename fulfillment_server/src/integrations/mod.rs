//! Adapters between the engine's provider traits and the concrete HTTP clients, plus the
//! parse/validate glue that turns raw provider payloads into the engine's typed shapes.
pub mod lulu;
pub mod shopify;

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a provider timestamp. Providers are inconsistent: full RFC 3339 timestamps for events,
/// bare dates for delivery estimates. A bare date is taken as midnight UTC.
pub(crate) fn parse_provider_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc())
}

#[cfg(test)]
mod test {
    use super::parse_provider_date;

    #[test]
    fn accepts_rfc3339_and_bare_dates() {
        assert!(parse_provider_date("2024-05-01T10:30:00+02:00").is_some());
        assert!(parse_provider_date("2024-05-01T10:30:00Z").is_some());
        let midnight = parse_provider_date("2024-05-01").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert!(parse_provider_date("next Tuesday").is_none());
    }
}
