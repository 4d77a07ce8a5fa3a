//! ISO-8601 timestamp helpers.
//!
//! Entry documents carry millisecond-precision UTC timestamps with a `Z`
//! suffix (`2024-05-01T12:30:00.000Z`).

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

pub fn to_iso_millis(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub fn from_epoch_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Serde adapter for `DateTime<Utc>` fields stored as ISO strings.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_iso_millis(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_millis_and_z_suffix() {
        let ts = from_epoch_millis(1_714_566_600_123);
        assert_eq!(to_iso_millis(&ts), "2024-05-01T12:30:00.123Z");
    }

    #[test]
    fn parses_offsets_into_utc() {
        let ts = parse_iso("2024-05-01T14:30:00+02:00").unwrap();
        assert_eq!(to_iso_millis(&ts), "2024-05-01T12:30:00.000Z");
        assert!(parse_iso("yesterday").is_none());
    }
}
