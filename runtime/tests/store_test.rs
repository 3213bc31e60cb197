//! Integration tests for the Store runtime
//!
//! A small box-office reducer exercises action serialization, effect
//! execution with retry, feedback actions, and graceful shutdown.

#![allow(clippy::unwrap_used)] // Test code

use std::sync::Arc;
use std::time::Duration;
use ticket_sale_core::effect::Effect;
use ticket_sale_core::event::SerializedEvent;
use ticket_sale_core::event_bus::EventBus;
use ticket_sale_core::reducer::Reducer;
use ticket_sale_core::{SmallVec, publish_event, smallvec};
use ticket_sale_runtime::{RetryPolicy, Store, StoreConfig, StoreError};
use ticket_sale_testing::InMemoryEventBus;

#[derive(Clone, Debug, Default)]
struct BoxOfficeState {
    seats_left: u32,
    sold: Vec<u64>,
    last_rejected: Option<u64>,
    publish_failures: u32,
}

#[derive(Clone, Debug)]
enum BoxOfficeAction {
    Sell { customer: u64 },
    PublishFailed,
}

#[derive(Clone)]
struct BoxOfficeEnv {
    bus: Arc<dyn EventBus>,
}

#[derive(Clone)]
struct BoxOfficeReducer;

impl Reducer for BoxOfficeReducer {
    type State = BoxOfficeState;
    type Action = BoxOfficeAction;
    type Environment = BoxOfficeEnv;

    fn reduce(
        &self,
        state: &mut BoxOfficeState,
        action: BoxOfficeAction,
        env: &BoxOfficeEnv,
    ) -> SmallVec<[Effect<BoxOfficeAction>; 4]> {
        match action {
            BoxOfficeAction::Sell { customer } => {
                if state.seats_left == 0 {
                    state.last_rejected = Some(customer);
                    return smallvec![Effect::None];
                }
                state.seats_left -= 1;
                state.sold.push(customer);
                state.last_rejected = None;

                smallvec![publish_event! {
                    bus: env.bus,
                    topic: "box-office",
                    event: SerializedEvent::new("SeatSold.v1".to_string(), customer.to_le_bytes().to_vec(), None),
                    on_success: || None,
                    on_error: |_error| Some(BoxOfficeAction::PublishFailed)
                }]
            },
            BoxOfficeAction::PublishFailed => {
                state.publish_failures += 1;
                smallvec![Effect::None]
            },
        }
    }
}

fn fast_retry(max_attempts: u32) -> StoreConfig {
    StoreConfig::default().with_retry_policy(
        RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false),
    )
}

fn store_with(
    seats: u32,
    bus: Arc<InMemoryEventBus>,
    config: StoreConfig,
) -> Store<BoxOfficeState, BoxOfficeAction, BoxOfficeEnv, BoxOfficeReducer> {
    Store::with_config(
        BoxOfficeState {
            seats_left: seats,
            ..BoxOfficeState::default()
        },
        BoxOfficeReducer,
        BoxOfficeEnv { bus },
        config,
    )
}

#[tokio::test]
async fn test_send_publishes_event() {
    let bus = Arc::new(InMemoryEventBus::new());
    let store = store_with(3, Arc::clone(&bus), fast_retry(3));

    let mut handle = store
        .send(BoxOfficeAction::Sell { customer: 7 })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(bus.event_types(), vec!["SeatSold.v1".to_string()]);
    assert_eq!(bus.published()[0].0, "box-office");
    assert_eq!(store.state(|s| s.seats_left).await, 2);
}

#[tokio::test]
async fn test_send_and_inspect_sees_own_outcome() {
    let bus = Arc::new(InMemoryEventBus::new());
    let store = store_with(1, bus, fast_retry(3));

    let (first, _) = store
        .send_and_inspect(BoxOfficeAction::Sell { customer: 1 }, |s| s.last_rejected)
        .await
        .unwrap();
    let (second, _) = store
        .send_and_inspect(BoxOfficeAction::Sell { customer: 2 }, |s| s.last_rejected)
        .await
        .unwrap();

    assert_eq!(first, None);
    assert_eq!(second, Some(2));
}

#[tokio::test]
async fn test_concurrent_sends_are_serialized() {
    let bus = Arc::new(InMemoryEventBus::new());
    let store = store_with(5, Arc::clone(&bus), fast_retry(3));

    let attempts = (0..20_u64).map(|customer| {
        let store = store.clone();
        async move {
            store
                .send_and_inspect(BoxOfficeAction::Sell { customer }, |s| {
                    s.last_rejected != Some(customer)
                })
                .await
                .unwrap()
        }
    });
    let results = futures::future::join_all(attempts).await;

    let accepted = results.iter().filter(|(accepted, _)| *accepted).count();
    assert_eq!(accepted, 5);

    for (_, mut handle) in results {
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    }

    let (seats_left, sold) = store.state(|s| (s.seats_left, s.sold.len())).await;
    assert_eq!(seats_left, 0);
    assert_eq!(sold, 5);
    assert_eq!(bus.len(), 5);
}

#[tokio::test]
async fn test_publish_is_retried_until_success() {
    let bus = Arc::new(InMemoryEventBus::failing(2));
    let store = store_with(1, Arc::clone(&bus), fast_retry(5));

    let mut handle = store
        .send(BoxOfficeAction::Sell { customer: 9 })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(bus.attempts(), 3);
    assert_eq!(bus.len(), 1);
    assert_eq!(store.state(|s| s.publish_failures).await, 0);
}

#[tokio::test]
async fn test_exhausted_publish_feeds_back_error_action() {
    let bus = Arc::new(InMemoryEventBus::failing(10));
    let store = store_with(1, Arc::clone(&bus), fast_retry(2));

    let mut handle = store
        .send(BoxOfficeAction::Sell { customer: 4 })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    // The sale stays committed; only the feedback action records the failure
    let (seats_left, failures) = store
        .state(|s| (s.seats_left, s.publish_failures))
        .await;
    assert_eq!(seats_left, 0);
    assert_eq!(failures, 1);
    assert_eq!(bus.attempts(), 2);
    assert!(bus.is_empty());
}

#[tokio::test]
async fn test_shutdown_rejects_new_actions() {
    let bus = Arc::new(InMemoryEventBus::new());
    let store = store_with(2, bus, fast_retry(3));

    store.shutdown(Duration::from_secs(1)).await.unwrap();
    assert!(store.is_shutting_down());

    let result = store.send(BoxOfficeAction::Sell { customer: 1 }).await;
    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    assert_eq!(store.state(|s| s.seats_left).await, 2);
}

#[tokio::test]
async fn test_shutdown_times_out_on_stuck_publication() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let bus = Arc::new(InMemoryEventBus::failing(100));
    let config = StoreConfig::default().with_retry_policy(
        RetryPolicy::new()
            .with_max_attempts(100)
            .with_initial_delay(Duration::from_millis(50))
            .with_jitter(false),
    );
    let store = store_with(1, bus, config);

    let _handle = store
        .send(BoxOfficeAction::Sell { customer: 1 })
        .await
        .unwrap();

    let result = store.shutdown(Duration::from_millis(20)).await;
    assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
}

#[tokio::test]
async fn test_shutdown_still_applies_feedback_from_in_flight_publication() {
    let bus = Arc::new(InMemoryEventBus::failing(usize::MAX));
    let config = StoreConfig::default().with_retry_policy(
        RetryPolicy::new()
            .with_max_attempts(2)
            .with_initial_delay(Duration::from_millis(20))
            .with_jitter(false),
    );
    let store = store_with(1, Arc::clone(&bus), config);

    let _handle = store
        .send(BoxOfficeAction::Sell { customer: 3 })
        .await
        .unwrap();

    // Publication is still retrying when shutdown begins
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(bus.attempts(), 2);
    assert_eq!(store.state(|s| s.publish_failures).await, 1);

    let result = store.send(BoxOfficeAction::PublishFailed).await;
    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}
