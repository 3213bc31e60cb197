//! Injected dependencies of the registry reducer.

use futures::future::BoxFuture;
use std::sync::Arc;
use ticket_sale_core::environment::Clock;
use ticket_sale_core::event::SerializedEvent;
use ticket_sale_core::event_bus::{EventBus, EventBusError};

/// Default topic for registry events
pub const DEFAULT_EVENT_TOPIC: &str = "ticket-sale-events";

/// Environment dependencies for the registry
#[derive(Clone)]
pub struct RegistryEnvironment {
    /// Clock for event timestamps
    pub clock: Arc<dyn Clock>,
    /// Event bus for publishing committed events
    pub event_bus: Arc<dyn EventBus>,
    /// Topic events are published to
    pub topic: String,
}

impl RegistryEnvironment {
    /// Creates a new `RegistryEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_bus: Arc<dyn EventBus>, topic: impl Into<String>) -> Self {
        Self {
            clock,
            event_bus,
            topic: topic.into(),
        }
    }
}

impl std::fmt::Debug for RegistryEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEnvironment")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

/// Event bus that writes each publication to the tracing log
///
/// Used by the demo binary, where there is no broker to publish to.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> BoxFuture<'_, Result<(), EventBusError>> {
        if topic.is_empty() {
            return Box::pin(async { Err(EventBusError::InvalidTopic(String::new())) });
        }

        tracing::info!(
            topic = %topic,
            event_type = %event.event_type,
            bytes = event.data.len(),
            metadata = ?event.metadata,
            "Event published"
        );
        Box::pin(async { Ok(()) })
    }
}
