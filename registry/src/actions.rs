//! Actions for the ticket registry: commands and the events they produce.

use crate::error::RegistryError;
use crate::types::{Address, TicketId, Wei};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticket_sale_core::event::Event;

/// Every input to the registry reducer
///
/// Commands are requests that may be rejected. Events are facts produced by
/// accepted commands; the reducer applies them, appends them to the journal
/// and publishes them. Sending an event directly replays it without validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryAction {
    // Commands
    /// Buy a ticket at the sale price
    BuyTicket {
        /// Requested ticket id (raw, validated against the range)
        ticket_id: u32,
        /// Amount sent with the purchase
        payment: Wei,
        /// Caller
        buyer: Address,
    },

    /// Offer to swap tickets with `target`
    OfferSwap {
        /// Caller, who must hold a ticket
        offerer: Address,
        /// Address the offer is made to
        target: Address,
    },

    /// Withdraw an outstanding swap offer
    CancelSwap {
        /// Caller
        offerer: Address,
    },

    /// Accept a swap offer made by `offerer`
    AcceptSwap {
        /// Address that made the offer
        offerer: Address,
        /// Caller, who must be the offer's target
        accepter: Address,
    },

    /// Return a held ticket, releasing its price to the owner
    ReturnTicket {
        /// Caller
        holder: Address,
    },

    /// Pay out the owner's balance
    WithdrawFunds {
        /// Caller, who must be the sale owner
        caller: Address,
    },

    // Events
    /// A ticket was sold
    TicketPurchased {
        /// Ticket sold
        ticket_id: TicketId,
        /// New owner
        buyer: Address,
        /// Amount collected
        price: Wei,
        /// When
        purchased_at: DateTime<Utc>,
    },

    /// A swap offer was made (replacing any earlier one)
    SwapOffered {
        /// Who offered
        offerer: Address,
        /// Who the offer names
        target: Address,
        /// When
        offered_at: DateTime<Utc>,
    },

    /// A swap offer was withdrawn
    SwapCancelled {
        /// Who offered
        offerer: Address,
        /// Who the withdrawn offer named
        target: Address,
        /// When
        cancelled_at: DateTime<Utc>,
    },

    /// Two holders exchanged tickets
    TicketsSwapped {
        /// Who offered
        offerer: Address,
        /// Who accepted
        accepter: Address,
        /// Ticket the offerer held before the swap
        offerer_ticket: TicketId,
        /// Ticket the accepter held before the swap
        accepter_ticket: TicketId,
        /// When
        swapped_at: DateTime<Utc>,
    },

    /// A ticket was returned and its price moved to the owner's balance
    TicketReturned {
        /// Ticket returned
        ticket_id: TicketId,
        /// Former owner
        holder: Address,
        /// Amount moved from collected funds to the owner's balance
        refund: Wei,
        /// When
        returned_at: DateTime<Utc>,
    },

    /// The owner's balance was paid out
    FundsWithdrawn {
        /// Sale owner
        owner: Address,
        /// Amount paid
        amount: Wei,
        /// When
        withdrawn_at: DateTime<Utc>,
    },

    /// A command was rejected
    ValidationFailed {
        /// Why
        error: RegistryError,
    },

    /// A committed event could not be published after all retries
    PublishFailed {
        /// Journal sequence of the event
        sequence: u64,
        /// Reason reported by the event bus
        reason: String,
    },
}

impl RegistryAction {
    /// Whether this action is a journaled domain event
    #[must_use]
    pub const fn is_domain_event(&self) -> bool {
        self.occurred_at().is_some()
    }

    /// Timestamp carried by a domain event
    #[must_use]
    pub const fn occurred_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TicketPurchased { purchased_at: at, .. }
            | Self::SwapOffered { offered_at: at, .. }
            | Self::SwapCancelled { cancelled_at: at, .. }
            | Self::TicketsSwapped { swapped_at: at, .. }
            | Self::TicketReturned { returned_at: at, .. }
            | Self::FundsWithdrawn { withdrawn_at: at, .. } => Some(*at),
            _ => None,
        }
    }

    /// Snake-case name of a command, used in logs and metrics
    #[must_use]
    pub const fn command_name(&self) -> Option<&'static str> {
        match self {
            Self::BuyTicket { .. } => Some("buy_ticket"),
            Self::OfferSwap { .. } => Some("offer_swap"),
            Self::CancelSwap { .. } => Some("cancel_swap"),
            Self::AcceptSwap { .. } => Some("accept_swap"),
            Self::ReturnTicket { .. } => Some("return_ticket"),
            Self::WithdrawFunds { .. } => Some("withdraw_funds"),
            _ => None,
        }
    }
}

impl Event for RegistryAction {
    fn event_type(&self) -> &'static str {
        match self {
            Self::TicketPurchased { .. } => "TicketPurchased.v1",
            Self::SwapOffered { .. } => "SwapOffered.v1",
            Self::SwapCancelled { .. } => "SwapCancelled.v1",
            Self::TicketsSwapped { .. } => "TicketsSwapped.v1",
            Self::TicketReturned { .. } => "TicketReturned.v1",
            Self::FundsWithdrawn { .. } => "FundsWithdrawn.v1",
            Self::ValidationFailed { .. } => "ValidationFailed.v1",
            Self::PublishFailed { .. } => "PublishFailed.v1",
            // Commands are never published; they still get a stable name
            Self::BuyTicket { .. }
            | Self::OfferSwap { .. }
            | Self::CancelSwap { .. }
            | Self::AcceptSwap { .. }
            | Self::ReturnTicket { .. }
            | Self::WithdrawFunds { .. } => "RegistryCommand.v1",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use ticket_sale_core::event::SerializedEvent;

    #[test]
    fn test_classification() {
        let command = RegistryAction::ReturnTicket {
            holder: Address::from_low_u64(1),
        };
        assert!(!command.is_domain_event());
        assert_eq!(command.command_name(), Some("return_ticket"));

        let event = RegistryAction::SwapOffered {
            offerer: Address::from_low_u64(1),
            target: Address::from_low_u64(2),
            offered_at: Utc::now(),
        };
        assert!(event.is_domain_event());
        assert_eq!(event.command_name(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = RegistryAction::TicketPurchased {
            ticket_id: TicketId::new(4),
            buyer: Address::from_low_u64(9),
            price: Wei::new(100),
            purchased_at: Utc::now(),
        };

        let serialized = SerializedEvent::from_event(&event, None).unwrap();
        assert_eq!(serialized.event_type, "TicketPurchased.v1");
        assert_eq!(RegistryAction::from_bytes(&serialized.data).unwrap(), event);
    }
}
