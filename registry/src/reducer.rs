//! Reducer for the ticket registry.
//!
//! Each command is validated against the current state. A rejected command
//! records a `ValidationFailed` event in `last_error` and changes nothing else.
//! An accepted command produces exactly one domain event, which is applied to
//! state, appended to the journal and returned as a publish effect.
//!
//! Validation order matters: when several preconditions fail at once, the
//! first failing check in each `validate_*` function decides the error.

use crate::actions::RegistryAction;
use crate::environment::RegistryEnvironment;
use crate::error::RegistryError;
use crate::types::{Address, RegistryState, TicketId, TicketStatus, Wei};
use ticket_sale_core::event::SerializedEvent;
use ticket_sale_core::{SmallVec, effect::Effect, publish_event, reducer::Reducer, smallvec};

/// Reducer for the ticket registry
#[derive(Clone, Debug, Default)]
pub struct RegistryReducer;

impl RegistryReducer {
    /// Creates a new `RegistryReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validates `BuyTicket`: range, availability, one ticket per buyer, exact payment
    fn validate_buy_ticket(
        state: &RegistryState,
        ticket_id: u32,
        payment: Wei,
        buyer: Address,
    ) -> Result<TicketId, RegistryError> {
        let ticket_id = state.checked_ticket_id(ticket_id)?;

        if state.ticket(ticket_id).status != TicketStatus::Available {
            return Err(RegistryError::AlreadySold(ticket_id));
        }

        if state.account(&buyer).held_ticket.is_some() {
            return Err(RegistryError::AlreadyOwnsTicket(buyer));
        }

        if payment != state.ticket_price() {
            return Err(RegistryError::WrongPayment {
                expected: state.ticket_price(),
                received: payment,
            });
        }

        Ok(ticket_id)
    }

    /// Validates `OfferSwap`
    fn validate_offer_swap(
        state: &RegistryState,
        offerer: Address,
        target: Address,
    ) -> Result<(), RegistryError> {
        if state.account(&offerer).held_ticket.is_none() {
            return Err(RegistryError::NoTicketHeld(offerer));
        }

        if target == offerer {
            return Err(RegistryError::InvalidTarget(target));
        }

        Ok(())
    }

    /// Validates `CancelSwap`, returning the target of the withdrawn offer
    fn validate_cancel_swap(
        state: &RegistryState,
        offerer: Address,
    ) -> Result<Address, RegistryError> {
        state
            .account(&offerer)
            .pending_swap
            .ok_or(RegistryError::NoPendingOffer(offerer))
    }

    /// Validates `AcceptSwap`, returning (offerer's ticket, accepter's ticket)
    fn validate_accept_swap(
        state: &RegistryState,
        offerer: Address,
        accepter: Address,
    ) -> Result<(TicketId, TicketId), RegistryError> {
        let offerer_account = state.account(&offerer);

        let target = offerer_account
            .pending_swap
            .ok_or(RegistryError::NoPendingOffer(offerer))?;

        if target != accepter {
            return Err(RegistryError::OfferMismatch {
                offerer,
                target,
                accepter,
            });
        }

        // The offerer may have returned their ticket since offering
        let offerer_ticket = offerer_account
            .held_ticket
            .ok_or(RegistryError::NoTicketHeld(offerer))?;
        let accepter_ticket = state
            .account(&accepter)
            .held_ticket
            .ok_or(RegistryError::NoTicketHeld(accepter))?;

        Ok((offerer_ticket, accepter_ticket))
    }

    /// Validates `ReturnTicket`, returning the ticket and the refund
    fn validate_return_ticket(
        state: &RegistryState,
        holder: Address,
    ) -> Result<(TicketId, Wei), RegistryError> {
        let ticket_id = state
            .account(&holder)
            .held_ticket
            .ok_or(RegistryError::NoTicketHeld(holder))?;

        let refund = state.ticket_price();
        if state.collected_funds().checked_sub(refund).is_none() {
            return Err(RegistryError::InsufficientFunds {
                required: refund,
                available: state.collected_funds(),
            });
        }

        Ok((ticket_id, refund))
    }

    /// Validates `WithdrawFunds`, returning the amount to pay out
    fn validate_withdraw_funds(
        state: &RegistryState,
        caller: Address,
    ) -> Result<Wei, RegistryError> {
        if caller != state.owner() {
            return Err(RegistryError::NotOwner(caller));
        }

        let balance = state.owner_balance();
        if balance.is_zero() {
            return Err(RegistryError::NothingToWithdraw(caller));
        }
        Ok(balance)
    }

    /// Checks the ticket ids carried by a replayed event
    fn validate_replay(
        state: &RegistryState,
        event: &RegistryAction,
    ) -> Result<(), RegistryError> {
        match event {
            RegistryAction::TicketPurchased { ticket_id, .. }
            | RegistryAction::TicketReturned { ticket_id, .. } => {
                state.checked_ticket_id(ticket_id.value())?;
            },
            RegistryAction::TicketsSwapped {
                offerer_ticket,
                accepter_ticket,
                ..
            } => {
                state.checked_ticket_id(offerer_ticket.value())?;
                state.checked_ticket_id(accepter_ticket.value())?;
            },
            _ => {},
        }
        Ok(())
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// Applies an event to state
    ///
    /// Domain events clear `last_error` and are appended to the journal.
    fn apply_event(state: &mut RegistryState, action: &RegistryAction) {
        match action {
            RegistryAction::TicketPurchased {
                ticket_id,
                buyer,
                price,
                ..
            } => {
                let ticket = state.ticket_mut(*ticket_id);
                ticket.status = TicketStatus::Sold;
                ticket.owner = Some(*buyer);
                state.account_mut(*buyer).held_ticket = Some(*ticket_id);
                state.collected_funds = state.collected_funds.saturating_add(*price);
            },

            RegistryAction::SwapOffered {
                offerer, target, ..
            } => {
                state.account_mut(*offerer).pending_swap = Some(*target);
            },

            RegistryAction::SwapCancelled { offerer, .. } => {
                state.account_mut(*offerer).pending_swap = None;
            },

            RegistryAction::TicketsSwapped {
                offerer,
                accepter,
                offerer_ticket,
                accepter_ticket,
                ..
            } => {
                let offerer_account = state.account_mut(*offerer);
                offerer_account.held_ticket = Some(*accepter_ticket);
                offerer_account.pending_swap = None;
                state.account_mut(*accepter).held_ticket = Some(*offerer_ticket);
                state.ticket_mut(*offerer_ticket).owner = Some(*accepter);
                state.ticket_mut(*accepter_ticket).owner = Some(*offerer);
            },

            RegistryAction::TicketReturned {
                ticket_id,
                holder,
                refund,
                ..
            } => {
                let ticket = state.ticket_mut(*ticket_id);
                ticket.status = TicketStatus::Refunded;
                ticket.owner = None;

                let account = state.account_mut(*holder);
                account.held_ticket = None;
                account.pending_swap = None;

                state.collected_funds = state.collected_funds.saturating_sub(*refund);
                state.owner_balance = state.owner_balance.saturating_add(*refund);
            },

            RegistryAction::FundsWithdrawn { amount, .. } => {
                state.owner_balance = state.owner_balance.saturating_sub(*amount);
                state.withdrawn_funds = state.withdrawn_funds.saturating_add(*amount);
            },

            RegistryAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },

            RegistryAction::PublishFailed { .. } => {
                state.undelivered_events += 1;
            },

            // Commands don't modify state directly
            RegistryAction::BuyTicket { .. }
            | RegistryAction::OfferSwap { .. }
            | RegistryAction::CancelSwap { .. }
            | RegistryAction::AcceptSwap { .. }
            | RegistryAction::ReturnTicket { .. }
            | RegistryAction::WithdrawFunds { .. } => {},
        }

        if let Some(recorded_at) = action.occurred_at() {
            state.last_error = None;
            state.record(action.clone(), recorded_at);
        }
    }

    /// Commits the outcome of a validated command
    fn commit(
        command: &'static str,
        state: &mut RegistryState,
        outcome: Result<RegistryAction, RegistryError>,
        env: &RegistryEnvironment,
    ) -> SmallVec<[Effect<RegistryAction>; 4]> {
        match outcome {
            Err(error) => {
                tracing::warn!(command, error = %error, "Command rejected");
                metrics::counter!(
                    "ticket_sale.commands",
                    "command" => command,
                    "outcome" => error.kind()
                )
                .increment(1);

                Self::apply_event(state, &RegistryAction::ValidationFailed { error });
                SmallVec::new()
            },
            Ok(event) => {
                Self::apply_event(state, &event);
                let sequence = state.journal().len() as u64;

                tracing::debug!(command, sequence, "Command accepted");
                metrics::counter!(
                    "ticket_sale.commands",
                    "command" => command,
                    "outcome" => "accepted"
                )
                .increment(1);

                Self::create_effects(event, sequence, env)
            },
        }
    }

    /// Creates the publish effect for a committed event
    fn create_effects(
        event: RegistryAction,
        sequence: u64,
        env: &RegistryEnvironment,
    ) -> SmallVec<[Effect<RegistryAction>; 4]> {
        let metadata = serde_json::json!({
            "sequence": sequence,
            "recorded_at": event.occurred_at(),
        });

        let serialized = match SerializedEvent::from_event(&event, Some(metadata)) {
            Ok(serialized) => serialized,
            Err(error) => {
                // The state change is already committed; only delivery is lost
                tracing::error!(sequence, error = %error, "Failed to serialize event");
                return smallvec![Effect::None];
            },
        };

        smallvec![publish_event! {
            bus: env.event_bus,
            topic: env.topic.as_str(),
            event: serialized,
            on_success: || None,
            on_error: |error| Some(RegistryAction::PublishFailed {
                sequence,
                reason: error.to_string()
            })
        }]
    }
}

impl Reducer for RegistryReducer {
    type State = RegistryState;
    type Action = RegistryAction;
    type Environment = RegistryEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let command = action.command_name().unwrap_or_default();

        match action {
            // ========== Commands ==========
            RegistryAction::BuyTicket {
                ticket_id,
                payment,
                buyer,
            } => {
                let outcome = Self::validate_buy_ticket(state, ticket_id, payment, buyer).map(
                    |ticket_id| RegistryAction::TicketPurchased {
                        ticket_id,
                        buyer,
                        price: payment,
                        purchased_at: env.clock.now(),
                    },
                );
                Self::commit(command, state, outcome, env)
            },

            RegistryAction::OfferSwap { offerer, target } => {
                let outcome = Self::validate_offer_swap(state, offerer, target).map(|()| {
                    RegistryAction::SwapOffered {
                        offerer,
                        target,
                        offered_at: env.clock.now(),
                    }
                });
                Self::commit(command, state, outcome, env)
            },

            RegistryAction::CancelSwap { offerer } => {
                let outcome = Self::validate_cancel_swap(state, offerer).map(|target| {
                    RegistryAction::SwapCancelled {
                        offerer,
                        target,
                        cancelled_at: env.clock.now(),
                    }
                });
                Self::commit(command, state, outcome, env)
            },

            RegistryAction::AcceptSwap { offerer, accepter } => {
                let outcome = Self::validate_accept_swap(state, offerer, accepter).map(
                    |(offerer_ticket, accepter_ticket)| RegistryAction::TicketsSwapped {
                        offerer,
                        accepter,
                        offerer_ticket,
                        accepter_ticket,
                        swapped_at: env.clock.now(),
                    },
                );
                Self::commit(command, state, outcome, env)
            },

            RegistryAction::ReturnTicket { holder } => {
                let outcome = Self::validate_return_ticket(state, holder).map(
                    |(ticket_id, refund)| RegistryAction::TicketReturned {
                        ticket_id,
                        holder,
                        refund,
                        returned_at: env.clock.now(),
                    },
                );
                Self::commit(command, state, outcome, env)
            },

            RegistryAction::WithdrawFunds { caller } => {
                let outcome = Self::validate_withdraw_funds(state, caller).map(|amount| {
                    RegistryAction::FundsWithdrawn {
                        owner: caller,
                        amount,
                        withdrawn_at: env.clock.now(),
                    }
                });
                Self::commit(command, state, outcome, env)
            },

            // ========== Feedback ==========
            RegistryAction::PublishFailed {
                sequence,
                ref reason,
            } => {
                tracing::error!(sequence, reason = %reason, "Event could not be published");
                metrics::counter!("ticket_sale.events.undelivered").increment(1);
                Self::apply_event(state, &action);
                SmallVec::new()
            },

            // ========== Events (replay) ==========
            event => {
                match Self::validate_replay(state, &event) {
                    Ok(()) => Self::apply_event(state, &event),
                    Err(error) => {
                        tracing::warn!(error = %error, "Replayed event rejected");
                        Self::apply_event(state, &RegistryAction::ValidationFailed { error });
                    },
                }
                SmallVec::new()
            },
        }
    }
}
