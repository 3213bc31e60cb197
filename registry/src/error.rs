//! Error types for the ticket sale registry.
//!
//! A rejected command changes nothing except the recorded `last_error`.

use crate::types::{Address, TicketId, Wei};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ticket_sale_runtime::StoreError;

/// Broad classification of a [`RegistryError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The request itself is malformed (bad ticket id, wrong amount)
    InvalidInput,
    /// The request is well-formed but the current state does not allow it
    PreconditionViolation,
}

/// Reasons the registry rejects a command
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryError {
    /// Ticket id outside `[1, total_tickets]`
    #[error("Invalid ticket {ticket_id}: ids range from 1 to {total_tickets}")]
    InvalidTicket {
        /// The requested id
        ticket_id: u32,
        /// Number of tickets in the sale
        total_tickets: u32,
    },

    /// Payment differs from the ticket price
    #[error("Wrong payment: ticket costs {expected}, received {received}")]
    WrongPayment {
        /// The ticket price
        expected: Wei,
        /// The amount sent
        received: Wei,
    },

    /// Ticket is not available (sold, or refunded and retired)
    #[error("Ticket {0} is not available")]
    AlreadySold(TicketId),

    /// Buyer already holds a ticket
    #[error("Address {0} already owns a ticket")]
    AlreadyOwnsTicket(Address),

    /// Address holds no ticket
    #[error("Address {0} holds no ticket")]
    NoTicketHeld(Address),

    /// Swap offered to oneself
    #[error("Address {0} cannot offer a swap to itself")]
    InvalidTarget(Address),

    /// Offerer has no outstanding swap offer
    #[error("Address {0} has no pending swap offer")]
    NoPendingOffer(Address),

    /// The offer names someone other than the accepter
    #[error("Swap offer from {offerer} names {target}, not {accepter}")]
    OfferMismatch {
        /// Who made the offer
        offerer: Address,
        /// Who the offer names
        target: Address,
        /// Who tried to accept
        accepter: Address,
    },

    /// Only the sale owner may withdraw funds
    #[error("Address {0} is not the sale owner")]
    NotOwner(Address),

    /// Owner balance is zero
    #[error("Address {0} has nothing to withdraw")]
    NothingToWithdraw(Address),

    /// Collected funds cannot cover a refund
    #[error("Insufficient funds: refund of {required} exceeds collected {available}")]
    InsufficientFunds {
        /// Amount needed
        required: Wei,
        /// Amount collected
        available: Wei,
    },
}

impl RegistryError {
    /// Category of this error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidTicket { .. } | Self::WrongPayment { .. } => ErrorCategory::InvalidInput,
            Self::AlreadySold(_)
            | Self::AlreadyOwnsTicket(_)
            | Self::NoTicketHeld(_)
            | Self::InvalidTarget(_)
            | Self::NoPendingOffer(_)
            | Self::OfferMismatch { .. }
            | Self::NotOwner(_)
            | Self::NothingToWithdraw(_)
            | Self::InsufficientFunds { .. } => ErrorCategory::PreconditionViolation,
        }
    }

    /// Short stable name, used as a metrics label
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTicket { .. } => "invalid_ticket",
            Self::WrongPayment { .. } => "wrong_payment",
            Self::AlreadySold(_) => "already_sold",
            Self::AlreadyOwnsTicket(_) => "already_owns_ticket",
            Self::NoTicketHeld(_) => "no_ticket_held",
            Self::InvalidTarget(_) => "invalid_target",
            Self::NoPendingOffer(_) => "no_pending_offer",
            Self::OfferMismatch { .. } => "offer_mismatch",
            Self::NotOwner(_) => "not_owner",
            Self::NothingToWithdraw(_) => "nothing_to_withdraw",
            Self::InsufficientFunds { .. } => "insufficient_funds",
        }
    }
}

/// Errors returned by [`TicketOffice`](crate::office::TicketOffice)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfficeError {
    /// The registry rejected the command
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The store could not process the command
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OfficeError {
    /// The registry rejection, if that is what this is
    #[must_use]
    pub const fn as_registry(&self) -> Option<&RegistryError> {
        match self {
            Self::Registry(error) => Some(error),
            Self::Store(_) => None,
        }
    }
}
