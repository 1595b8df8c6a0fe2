//! Serde `with` module for the summary's generation timestamp.
//!
//! Written as UTC with microsecond precision and a literal `Z` suffix,
//! e.g. `2025-10-19T03:00:07.123456Z`. Any RFC 3339 timestamp is accepted back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use std::result::Result;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format(source: &DateTime<Utc>) -> String {
    source.format(FORMAT).to_string()
}

pub fn serialize<S>(source: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(source))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Serialize;

    #[derive(Serialize, Deserialize)]
    struct Stamp {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_format_has_zulu_suffix() {
        let at = Utc.with_ymd_and_hms(2025, 10, 19, 3, 0, 7).unwrap();
        assert_eq!(format(&at), "2025-10-19T03:00:07.000000Z");
    }

    #[test]
    fn test_serde_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 7, 15, 12, 30, 0).unwrap();
        let json = serde_json::to_string(&Stamp { at }).unwrap();
        assert_eq!(json, r#"{"at":"2024-07-15T12:30:00.000000Z"}"#);
        let back: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<Stamp>(r#"{"at":"yesterday"}"#).is_err());
    }
}
