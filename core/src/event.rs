//! Domain events emitted by the engine for external subscribers.
//!
//! A domain event is an immutable fact ("BookingApproved", "CertificateIssued")
//! that a notifier may pick up. The engine never depends on delivery: it
//! serializes the fact, hands it to an [`EventBus`](crate::event_bus::EventBus)
//! and moves on.
//!
//! Events travel as bincode bytes wrapped in a [`SerializedEvent`] envelope
//! whose `event_type` carries a version suffix (`"BookingApproved.v1"`) so
//! subscribers can route and evolve schemas independently.
//!
//! # Example
//!
//! ```
//! use certifytrack_core::event::{DomainEvent, SerializedEvent};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum HallEvent {
//!     Withdrawn { code: String },
//! }
//!
//! impl DomainEvent for HallEvent {
//!     fn event_type(&self) -> &'static str {
//!         "HallWithdrawn.v1"
//!     }
//! }
//!
//! let envelope = SerializedEvent::from_event(
//!     &HallEvent::Withdrawn { code: "H1".to_string() },
//!     None,
//! ).unwrap();
//! assert_eq!(envelope.event_type, "HallWithdrawn.v1");
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event encoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// A fact emitted by the engine.
///
/// `event_type()` must return a stable, versioned identifier. Serialization
/// defaults to bincode for any `Serialize + DeserializeOwned` implementor.
pub trait DomainEvent: Send + Sync + 'static {
    /// Versioned type identifier, e.g. `"CertificateIssued.v1"`.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be encoded.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are corrupt or
    /// belong to a different schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// Wire envelope handed to the event bus.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// Versioned type identifier.
    pub event_type: String,

    /// bincode payload.
    pub data: Vec<u8>,

    /// Optional JSON metadata (`actor_id`, `event_id`, `correlation_id`, ...).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new envelope from raw parts.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Encode a [`DomainEvent`] into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be encoded.
    pub fn from_event<E: DomainEvent + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Decode the payload back into a concrete event type.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload does not
    /// match `E`.
    pub fn decode<E: DomainEvent + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum RosterEvent {
        Joined { subject: String },
        Left { subject: String, reason: String },
    }

    impl DomainEvent for RosterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                RosterEvent::Joined { .. } => "RosterJoined.v1",
                RosterEvent::Left { .. } => "RosterLeft.v1",
            }
        }
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn envelope_carries_versioned_type_and_metadata() {
        let event = RosterEvent::Left {
            subject: "s-1".to_string(),
            reason: "clash with exam".to_string(),
        };
        let metadata = serde_json::json!({ "actor_id": "mentor-7" });

        let envelope = SerializedEvent::from_event(&event, Some(metadata.clone()))
            .expect("serialization should succeed");

        assert_eq!(envelope.event_type, "RosterLeft.v1");
        assert_eq!(envelope.metadata, Some(metadata));
        let decoded: RosterEvent = envelope.decode().expect("decode should succeed");
        assert_eq!(decoded, event);
    }

    #[test]
    fn decoding_garbage_is_an_error() {
        let envelope = SerializedEvent::new("RosterJoined.v1".to_string(), vec![0xff], None);
        let result: Result<RosterEvent, _> = envelope.decode();
        assert!(matches!(result, Err(EventError::DeserializationError(_))));
    }

    #[test]
    fn display_reports_type_and_size() {
        let envelope = SerializedEvent::new("RosterJoined.v1".to_string(), vec![1, 2, 3], None);
        let display = format!("{envelope}");
        assert!(display.contains("RosterJoined.v1"));
        assert!(display.contains("3 bytes"));
    }
}
