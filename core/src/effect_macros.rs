//! Declarative macros for ergonomic effect construction

/// Create an `Effect::PublishEvent` operation
///
/// # Example
///
/// ```rust,ignore
/// use ticket_sale_core::publish_event;
///
/// publish_event! {
///     bus: env.event_bus,
///     topic: "ticket-sale-events",
///     event: serialized_event,
///     on_success: || None,
///     on_error: |error| Some(RegistryAction::PublishFailed { reason: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! publish_event {
    (
        bus: $bus:expr,
        topic: $topic:expr,
        event: $event:expr,
        on_success: || $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::PublishEvent(
            $crate::effect::EventBusOperation::Publish {
                event_bus: ::std::sync::Arc::clone(&$bus),
                topic: $topic.to_string(),
                event: $event,
                on_success: ::std::boxed::Box::new(move |()| $success_body),
                on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
            }
        )
    };
}
