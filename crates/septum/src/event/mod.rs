//! Event record shared by timelines, the timer queue and pipelines.
//!
//! An [`Event`] is immutable once constructed. Timelines and the timer queue
//! hold it through an [`EventRef`], so a timer event registered in both
//! places is one logical record with two list memberships.
//!
//! The compact binary representation lives in [`codec`]; the structured
//! (serde) representation uses the field names `id`, `timeline`,
//! `timestamp`, `receive_time`, `kind` and `data`.

pub mod codec;

pub use codec::EventView;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Instant type used for event time fields.
///
/// The offset is kept so that non-UTC instants can be detected and rejected
/// by the encoder. Ordering and equality compare the instant only.
pub type Timestamp = DateTime<FixedOffset>;

/// Shared handle to an admitted event.
pub type EventRef = Rc<Event>;

/// A time-stamped, typed event belonging to one timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: u64,
    timeline: u64,
    timestamp: Timestamp,
    receive_time: Timestamp,
    kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    data: Vec<u8>,
}

impl Event {
    /// Creates a new event.
    ///
    /// An empty `data` payload is equivalent to no payload.
    pub fn new(
        id: u64,
        timeline: u64,
        kind: impl Into<String>,
        timestamp: impl Into<Timestamp>,
        receive_time: impl Into<Timestamp>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            timeline,
            timestamp: timestamp.into(),
            receive_time: receive_time.into(),
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Returns the unique event id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the id of the owning timeline.
    pub fn timeline(&self) -> u64 {
        self.timeline
    }

    /// Returns the event time, the sort key within a timeline.
    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    /// Returns the time the event was admitted.
    pub fn receive_time(&self) -> &Timestamp {
        &self.receive_time
    }

    /// Returns the event kind label.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the payload; empty when the event carries none.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Caller-side input record for admitting an event.
///
/// The id and receive time are assigned by the
/// [`Nexus`](crate::Nexus) on admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Target timeline id (must be at least 1).
    pub timeline: u64,
    /// Event time.
    pub timestamp: Timestamp,
    /// Event kind label.
    pub kind: String,
    /// Optional payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl EventData {
    /// Creates a new input record.
    pub fn new(
        timeline: u64,
        timestamp: impl Into<Timestamp>,
        kind: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            timeline,
            timestamp: timestamp.into(),
            kind: kind.into(),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_event() -> Event {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let rt = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 5).unwrap();
        Event::new(7, 2, "TestEvent", ts, rt, b"Some event data".to_vec())
    }

    #[test]
    fn test_accessors() {
        let event = sample_event();
        assert_eq!(event.id(), 7);
        assert_eq!(event.timeline(), 2);
        assert_eq!(event.kind(), "TestEvent");
        assert_eq!(event.data(), b"Some event data");
        assert!(event.timestamp() < event.receive_time());
    }

    #[test]
    fn test_json_roundtrip() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"receive_time\""));
        assert!(json.contains("\"kind\":\"TestEvent\""));

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_json_omits_empty_data() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let event = Event::new(1, 1, "Tick", ts, ts, Vec::new());
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("\"data\""));

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert!(decoded.data().is_empty());
    }

    #[test]
    fn test_event_data_json_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let input = EventData::new(3, ts, "Opened", "payload");
        let json = serde_json::to_string(&input).unwrap();
        let decoded: EventData = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, input);
    }
}
