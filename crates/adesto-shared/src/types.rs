use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::HOURS;

// Space identity = backend row UUID
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(pub Uuid);

impl SpaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when an hour label cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid hour label: {0}")]
pub struct InvalidHour(pub String);

/// One of the 24 discrete hour labels a signal row carries (`12AM`..`11PM`).
///
/// Stored and serialized as the label string, never as a number, so rows
/// round-trip unchanged through the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hour(u8);

impl Hour {
    /// Build from an hour index in `0..24` (0 = midnight).
    pub fn from_index(index: u8) -> Result<Self, InvalidHour> {
        if index < 24 {
            Ok(Self(index))
        } else {
            Err(InvalidHour(index.to_string()))
        }
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// The display/storage label, e.g. `"8AM"`.
    pub fn label(&self) -> &'static str {
        HOURS[self.0 as usize]
    }

    /// All 24 hours, midnight first.
    pub fn all() -> impl Iterator<Item = Hour> {
        (0u8..24).map(Hour)
    }
}

impl std::str::FromStr for Hour {
    type Err = InvalidHour;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HOURS
            .iter()
            .position(|label| *label == s)
            .map(|i| Hour(i as u8))
            .ok_or_else(|| InvalidHour(s.to_string()))
    }
}

impl std::fmt::Display for Hour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<String> for Hour {
    type Error = InvalidHour;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Hour> for String {
    fn from(h: Hour) -> Self {
        h.label().to_string()
    }
}

/// A (date, hour) pair: the unit of aggregation for the heatmap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub hour: Hour,
}

impl SlotKey {
    pub fn new(date: NaiveDate, hour: Hour) -> Self {
        Self { date, hour }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.date, self.hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_labels_round_trip() {
        for h in Hour::all() {
            let parsed: Hour = h.label().parse().expect("label should parse");
            assert_eq!(parsed, h);
        }
    }

    #[test]
    fn hour_rejects_unknown_labels() {
        assert!("25PM".parse::<Hour>().is_err());
        assert!("8am".parse::<Hour>().is_err());
        assert!(Hour::from_index(24).is_err());
    }

    #[test]
    fn slot_key_display_matches_storage_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let slot = SlotKey::new(date, "8AM".parse().unwrap());
        assert_eq!(slot.to_string(), "2024-01-15-8AM");
    }

    #[test]
    fn hour_serializes_as_label() {
        let h: Hour = "3PM".parse().unwrap();
        assert_eq!(serde_json::to_string(&h).unwrap(), "\"3PM\"");
        let back: Hour = serde_json::from_str("\"3PM\"").unwrap();
        assert_eq!(back, h);
    }
}
