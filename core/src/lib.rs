//! # Ticket Sale Core
//!
//! Core traits and types shared by the ticket sale registry and its runtime.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by a single store
//! - **Action**: Every input to a reducer (commands and the events they produce)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions, executed later by the runtime
//! - **Environment**: Injected dependencies (clock, event bus)
//!
//! ## Example
//!
//! ```ignore
//! use ticket_sale_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for RegistryReducer {
//!     type State = RegistryState;
//!     type Action = RegistryAction;
//!     type Environment = RegistryEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut RegistryState,
//!         action: RegistryAction,
//!         env: &RegistryEnvironment,
//!     ) -> SmallVec<[Effect<RegistryAction>; 4]> {
//!         // Validate, apply the resulting event, describe effects
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Event trait and serialized wire format
pub mod event;

/// Event bus abstraction for publishing committed events
pub mod event_bus;

/// Declarative macros for building effects
mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce at most a handful of effects, so the
        /// return type keeps up to four inline without allocating.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution): a reducer returns them, the store runs them.
pub mod effect {
    use crate::event::SerializedEvent;
    use crate::event_bus::{EventBus, EventBusError};
    use std::sync::Arc;

    /// Callback invoked when an effect succeeds, optionally producing a feedback action
    pub type OnSuccess<T, Action> = Box<dyn FnOnce(T) -> Option<Action> + Send>;

    /// Callback invoked when an effect fails, optionally producing a feedback action
    pub type OnError<E, Action> = Box<dyn FnOnce(E) -> Option<Action> + Send>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Publish a committed event to the event bus
        PublishEvent(EventBusOperation<Action>),
    }

    /// Event bus operations that can be described as effects
    pub enum EventBusOperation<Action> {
        /// Publish one serialized event to a topic
        Publish {
            /// Bus to publish on
            event_bus: Arc<dyn EventBus>,
            /// Destination topic
            topic: String,
            /// Event payload
            event: SerializedEvent,
            /// Called once the publish succeeded
            on_success: OnSuccess<(), Action>,
            /// Called once retries are exhausted
            on_error: OnError<EventBusError, Action>,
        },
    }

    // Manual Debug implementation since the callbacks don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::PublishEvent(EventBusOperation::Publish { topic, event, .. }) => f
                    .debug_struct("Effect::PublishEvent")
                    .field("topic", topic)
                    .field("event_type", &event.event_type)
                    .finish_non_exhaustive(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use ticket_sale_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn none_effect_is_none() {
        let effect: Effect<()> = Effect::None;
        assert!(effect.is_none());
        assert_eq!(format!("{effect:?}"), "Effect::None");
    }
}
