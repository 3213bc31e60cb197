//! # Ticket Sale Testing
//!
//! Testing utilities for the ticket sale registry.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (fixed clock, in-memory event bus)
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use ticket_sale_testing::{test_clock, InMemoryEventBus};
//! use ticket_sale_runtime::Store;
//!
//! #[tokio::test]
//! async fn buy_publishes_event() {
//!     let bus = Arc::new(InMemoryEventBus::new());
//!     let env = RegistryEnvironment::new(Arc::new(test_clock()), bus.clone(), "sales");
//!     let store = Store::new(RegistryState::new(config), RegistryReducer::new(), env);
//!
//!     let mut handle = store.send(RegistryAction::BuyTicket { .. }).await?;
//!     handle.wait().await;
//!     assert_eq!(bus.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use ticket_sale_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use futures::future::BoxFuture;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ticket_sale_core::event::SerializedEvent;
    use ticket_sale_core::event_bus::{EventBus, EventBusError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_sale_testing::mocks::FixedClock;
    /// use ticket_sale_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory event bus that records every publication
    ///
    /// Can be configured to reject the first `n` publish attempts, which is
    /// how retry behavior is exercised in tests.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_sale_testing::mocks::InMemoryEventBus;
    ///
    /// let bus = InMemoryEventBus::new();
    /// assert!(bus.is_empty());
    /// ```
    #[derive(Debug, Default)]
    pub struct InMemoryEventBus {
        published: Mutex<Vec<(String, SerializedEvent)>>,
        failures_remaining: AtomicUsize,
        attempts: AtomicUsize,
    }

    impl InMemoryEventBus {
        /// Create an empty bus that accepts every publication
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a bus whose first `failures` publish attempts fail
        #[must_use]
        pub fn failing(failures: usize) -> Self {
            Self {
                failures_remaining: AtomicUsize::new(failures),
                ..Self::default()
            }
        }

        /// All accepted publications in the order they arrived
        #[must_use]
        pub fn published(&self) -> Vec<(String, SerializedEvent)> {
            self.published
                .lock()
                .map(|events| events.clone())
                .unwrap_or_default()
        }

        /// Event type names of accepted publications, in order
        #[must_use]
        pub fn event_types(&self) -> Vec<String> {
            self.published()
                .into_iter()
                .map(|(_, event)| event.event_type)
                .collect()
        }

        /// Number of accepted publications
        #[must_use]
        pub fn len(&self) -> usize {
            self.published.lock().map(|events| events.len()).unwrap_or(0)
        }

        /// Whether nothing has been published yet
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Number of publish attempts, including rejected ones
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl EventBus for InMemoryEventBus {
        fn publish(
            &self,
            topic: &str,
            event: &SerializedEvent,
        ) -> BoxFuture<'_, Result<(), EventBusError>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let rejected = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            let result = if rejected {
                Err(EventBusError::TransportError(format!(
                    "simulated outage on '{topic}'"
                )))
            } else {
                self.published
                    .lock()
                    .map(|mut events| events.push((topic.to_string(), event.clone())))
                    .map_err(|e| EventBusError::PublishFailed {
                        topic: topic.to_string(),
                        reason: e.to_string(),
                    })
            };

            Box::pin(async move { result })
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryEventBus, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use ticket_sale_core::event::SerializedEvent;
    use ticket_sale_core::event_bus::EventBus;

    fn sample_event() -> SerializedEvent {
        SerializedEvent::new("TicketPurchased.v1".to_string(), vec![1, 2, 3], None)
    }

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_in_memory_bus_records_publications() {
        let bus = InMemoryEventBus::new();

        tokio_test::block_on(bus.publish("sales", &sample_event())).unwrap();

        assert_eq!(bus.len(), 1);
        assert_eq!(bus.event_types(), vec!["TicketPurchased.v1".to_string()]);
        assert_eq!(bus.published()[0].0, "sales");
    }

    #[tokio::test]
    async fn test_failing_bus_rejects_then_accepts() {
        let bus = InMemoryEventBus::failing(2);

        assert!(bus.publish("sales", &sample_event()).await.is_err());
        assert!(bus.publish("sales", &sample_event()).await.is_err());
        assert!(bus.publish("sales", &sample_event()).await.is_ok());

        assert_eq!(bus.attempts(), 3);
        assert_eq!(bus.len(), 1);
    }
}
