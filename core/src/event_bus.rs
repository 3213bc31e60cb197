//! Event bus abstraction for publishing committed registry events.
//!
//! The registry commits a state change first and only then publishes the
//! resulting event, so subscribers see events in journal order but possibly
//! more than once (publication is retried). Subscribers must be idempotent;
//! the journal sequence number in the event metadata is the idempotency key.
//!
//! # Implementations
//!
//! - `InMemoryEventBus` in the testing crate records every publication.

use crate::event::SerializedEvent;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Topic not found or invalid
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// Network or transport error
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Trait for event bus implementations.
///
/// Uses an explicit `BoxFuture` return instead of `async fn` so the trait
/// stays object safe: effects capture an `Arc<dyn EventBus>`.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation fails.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> BoxFuture<'_, Result<(), EventBusError>>;
}
