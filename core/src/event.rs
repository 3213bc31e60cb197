//! Event trait and the serialized wire format used for publication.
//!
//! Events are facts about operations the registry has already committed.
//! Payloads are encoded with `bincode`; the event type name carries a version
//! suffix (`"TicketPurchased.v1"`) so consumers can route and evolve schemas.
//!
//! # Example
//!
//! ```
//! use ticket_sale_core::event::{Event, SerializedEvent};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! enum SaleEvent {
//!     Purchased { ticket: u32 },
//! }
//!
//! impl Event for SaleEvent {
//!     fn event_type(&self) -> &'static str {
//!         "Purchased.v1"
//!     }
//! }
//!
//! let event = SaleEvent::Purchased { ticket: 3 };
//! let serialized = SerializedEvent::from_event(&event, None).unwrap();
//! assert_eq!(serialized.event_type, "Purchased.v1");
//! assert_eq!(SaleEvent::from_bytes(&serialized.data).unwrap(), event);
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be serialized and published after it was committed.
///
/// `event_type()` must return a stable identifier including a version,
/// e.g. `"TicketReturned.v1"`.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
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
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// encode a different type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for publication.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "TicketPurchased.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional JSON metadata (journal sequence number, timestamps).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
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

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
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
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Opened { id: u32 },
        Closed { id: u32, reason: String },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Opened { .. } => "Opened.v1",
                Self::Closed { .. } => "Closed.v1",
            }
        }
    }

    #[test]
    fn test_from_event_keeps_type_and_metadata() {
        let event = TestEvent::Closed {
            id: 7,
            reason: "done".to_string(),
        };
        let serialized =
            SerializedEvent::from_event(&event, Some(serde_json::json!({ "sequence": 4 })))
                .unwrap();

        assert_eq!(serialized.event_type, "Closed.v1");
        assert_eq!(
            serialized.metadata,
            Some(serde_json::json!({ "sequence": 4 }))
        );
        assert_eq!(TestEvent::from_bytes(&serialized.data).unwrap(), event);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = TestEvent::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(EventError::DeserializationError(_))));
    }

    #[test]
    fn test_display() {
        let event = SerializedEvent::new("Opened.v1".to_string(), vec![1, 2, 3], None);
        assert_eq!(
            event.to_string(),
            "SerializedEvent { type: Opened.v1, size: 3 bytes }"
        );
    }
}
