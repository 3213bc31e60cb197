//! # Ticket Sale Runtime
//!
//! The Store runtime that owns reducer state, serializes every submitted
//! action into a single total order, and executes the effects reducers return.
//!
//! ## Core Components
//!
//! - **Store**: Owns state behind a write lock; one action is reduced at a time
//! - **Effect Executor**: Runs effect descriptions (event publication with retry)
//!   and feeds any resulting actions back into the store
//! - **`EffectHandle`**: Lets callers wait for the effects of one action
//!
//! ## Example
//!
//! ```ignore
//! use ticket_sale_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! // Send an action and read its outcome under the same lock acquisition
//! let (outcome, _handle) = store
//!     .send_and_inspect(action, |state| state.last_error.clone())
//!     .await?;
//!
//! // Read state
//! let sold = store.state(|s| s.sold_count()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use ticket_sale_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};

/// Retry logic with exponential backoff
pub mod retry;

pub use retry::RetryPolicy;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// An effect execution failed
        ///
        /// Logged by the store; effects never roll back committed state.
        #[error("Effect execution failed: {0}")]
        EffectFailed(String),

        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Store configuration
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ticket_sale_runtime::{RetryPolicy, StoreConfig};
///
/// let config = StoreConfig::default()
///     .with_retry_policy(RetryPolicy::new().with_max_attempts(3))
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.retry_policy.max_attempts(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Retry policy for failed effects
    pub retry_policy: RetryPolicy,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the retry policy
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] so callers can wait until the effects of that
/// action (event publication) have finished.
///
/// ```ignore
/// let mut handle = store.send(Action::Buy { .. }).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle and the tracking context that drives it
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// The counter is decremented even if the effect task panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RetryPolicy, RwLock, StoreConfig,
        StoreError,
    };
    use crate::retry::retry_with_backoff;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer always runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Concurrent `send` calls are serialized: each action is reduced to
    /// completion before the next one starts, so no caller ever observes a
    /// partially applied action.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        retry_policy: RetryPolicy,
        default_shutdown_timeout: Duration,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                retry_policy: config.retry_policy,
                default_shutdown_timeout: config.default_shutdown_timeout,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Timeout used by [`Store::shutdown_gracefully`]
        #[must_use]
        pub const fn default_shutdown_timeout(&self) -> Duration {
            self.default_shutdown_timeout
        }

        /// Whether shutdown has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (new actions are rejected), then waits for
        /// pending effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running",
                        pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the default timeout expires.
        pub async fn shutdown_gracefully(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Releases the lock and starts the returned effects
        ///
        /// `send()` returns after effects are started, not completed; use the
        /// returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_internal(action, |_| (), false)
                .await
                .map(|((), handle)| handle)
        }

        /// Send an action and inspect the resulting state before any other action runs
        ///
        /// `inspect` runs under the same write lock acquisition that reduced
        /// `action`, so the value it returns reflects exactly this action's
        /// outcome even when many callers submit actions concurrently. This is
        /// how request/response callers learn whether their command was accepted.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action, inspect), name = "store_send_and_inspect")]
        pub async fn send_and_inspect<F, T>(
            &self,
            action: A,
            inspect: F,
        ) -> Result<(T, EffectHandle), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            self.send_internal(action, inspect, false).await
        }

        /// Reduce `action`, then start its effects
        ///
        /// Feedback actions from in-flight effects pass `bypass_shutdown` so
        /// that work accepted before shutdown still lands in state while
        /// shutdown waits for it.
        async fn send_internal<F, T>(
            &self,
            action: A,
            inspect: F,
            bypass_shutdown: bool,
        ) -> Result<(T, EffectHandle), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            if !bypass_shutdown && self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let (inspected, effects) = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                // Note: Precision loss acceptable for metrics (effect counts < 2^52)
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                (inspect(&*state), effects)
            };

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }
            tracing::debug!("Action processing completed, returning handle");

            Ok((inspected, handle))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let sold = store.state(|s| s.sold_count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Execute an effect with tracking
        ///
        /// `PublishEvent` runs in a spawned task with retry; any action its
        /// callback returns is sent back into the store.
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            use ticket_sale_core::effect::EventBusOperation;

            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::PublishEvent(EventBusOperation::Publish {
                    event_bus,
                    topic,
                    event,
                    on_success,
                    on_error,
                }) => {
                    tracing::trace!("Executing Effect::PublishEvent");
                    metrics::counter!("store.effects.executed", "type" => "publish_event")
                        .increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;

                        tracing::debug!(
                            topic = %topic,
                            event_type = %event.event_type,
                            "Executing publish"
                        );

                        let result = retry_with_backoff(&store.retry_policy, "publish", || {
                            let event_bus = Arc::clone(&event_bus);
                            let topic = topic.clone();
                            let event = event.clone();
                            async move { event_bus.publish(&topic, &event).await }
                        })
                        .await;

                        let action = match result {
                            Ok(()) => {
                                tracing::debug!(topic = %topic, "publish succeeded");
                                on_success(())
                            },
                            Err(error) => {
                                tracing::warn!(topic = %topic, error = %error, "publish failed");
                                on_error(error)
                            },
                        };

                        // Sent before the pending guard drops, so shutdown waits for it
                        if let Some(action) = action {
                            tracing::trace!("Publish produced an action, sending to store");
                            if let Err(error) = store.send_internal(action, |_| (), true).await {
                                tracing::warn!(error = %error, "Feedback action rejected");
                            }
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                retry_policy: self.retry_policy.clone(),
                default_shutdown_timeout: self.default_shutdown_timeout,
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
