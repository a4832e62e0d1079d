use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{EventId, Result};

/// A business payload together with the metadata injected by the publish path.
///
/// On the wire the payload's fields sit at the top level of the JSON object
/// next to `eventId` and `timestamp`:
///
/// ```text
/// {"eventId":"…","timestamp":"2024-05-01T10:00:00Z","orderId":"…","status":"SUCCESS",…}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Fresh identifier for this emission, never reused across events.
    #[serde(rename = "eventId")]
    pub event_id: EventId,

    /// When the event was published.
    pub timestamp: DateTime<Utc>,

    /// The stage-specific business payload.
    #[serde(flatten)]
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Wraps a payload with a new event id and the current time.
    pub fn new(payload: T) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Replaces the payload, keeping the envelope metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EventEnvelope<U> {
        EventEnvelope {
            event_id: self.event_id,
            timestamp: self.timestamp,
            payload: f(self.payload),
        }
    }
}

impl<T: Serialize> EventEnvelope<T> {
    /// Encodes the envelope as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<T: DeserializeOwned> EventEnvelope<T> {
    /// Decodes an envelope from raw message bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
