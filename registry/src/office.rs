//! `TicketOffice`: request/response facade over the registry store.
//!
//! Each method submits one command and reports that command's outcome. The
//! outcome is read under the same lock acquisition that applied the command,
//! so callers racing on the same office never see each other's results.

use crate::actions::RegistryAction;
use crate::config::SaleConfig;
use crate::environment::RegistryEnvironment;
use crate::error::{OfficeError, RegistryError};
use crate::reducer::RegistryReducer;
use crate::types::{Address, JournalEntry, RegistryState, TicketId, TicketStatus, Wei};
use serde::Serialize;
use ticket_sale_runtime::{Store, StoreConfig};

/// Store type hosting the registry
pub type RegistryStore = Store<RegistryState, RegistryAction, RegistryEnvironment, RegistryReducer>;

/// Point-in-time summary of a sale
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaleSummary {
    /// Number of tickets
    pub total_tickets: u32,
    /// Price of one ticket
    pub ticket_price: Wei,
    /// Sale creator
    pub owner: Address,
    /// Tickets not yet sold
    pub available: u32,
    /// Tickets currently owned
    pub sold: u32,
    /// Tickets returned
    pub refunded: u32,
    /// Funds held for sold tickets
    pub collected_funds: Wei,
    /// Price of returned tickets, withdrawable by the owner
    pub owner_balance: Wei,
    /// Paid out to the owner
    pub withdrawn_funds: Wei,
    /// Committed events
    pub journal_length: usize,
    /// Committed events that could not be published
    pub undelivered_events: u64,
}

/// Ticket sale front desk
///
/// Cloning is cheap; clones share the same registry.
///
/// # Example
///
/// ```ignore
/// let office = TicketOffice::new(&SaleConfig::default(), environment);
/// let ticket = office.buy_ticket(1, Wei::new(100), buyer).await?;
/// assert_eq!(office.ticket_of(&buyer).await, ticket.value());
/// ```
#[derive(Clone)]
pub struct TicketOffice {
    store: RegistryStore,
}

impl TicketOffice {
    /// Opens a sale with the terms in `config`
    #[must_use]
    pub fn new(config: &SaleConfig, environment: RegistryEnvironment) -> Self {
        Self::with_store_config(config, environment, StoreConfig::default())
    }

    /// Opens a sale with custom runtime settings
    #[must_use]
    pub fn with_store_config(
        config: &SaleConfig,
        environment: RegistryEnvironment,
        store_config: StoreConfig,
    ) -> Self {
        let state = RegistryState::new(config.total_tickets, config.ticket_price, config.owner);
        let store_config = store_config.with_shutdown_timeout(config.shutdown_timeout());
        Self {
            store: Store::with_config(state, RegistryReducer::new(), environment, store_config),
        }
    }

    /// Submits `action` and extracts its outcome from the resulting state
    async fn execute<T, F>(&self, action: RegistryAction, outcome: F) -> Result<T, OfficeError>
    where
        F: FnOnce(&RegistryState) -> T,
    {
        let (result, _effects) = self
            .store
            .send_and_inspect(action, |state| match &state.last_error {
                Some(error) => Err(error.clone()),
                None => Ok(outcome(state)),
            })
            .await?;

        Ok(result?)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Buys `ticket_id` for `buyer`, paying `payment`
    ///
    /// # Errors
    ///
    /// `InvalidTicket`, `AlreadySold`, `AlreadyOwnsTicket` or `WrongPayment`,
    /// checked in that order; or a store error during shutdown.
    pub async fn buy_ticket(
        &self,
        ticket_id: u32,
        payment: Wei,
        buyer: Address,
    ) -> Result<TicketId, OfficeError> {
        self.execute(
            RegistryAction::BuyTicket {
                ticket_id,
                payment,
                buyer,
            },
            |_| TicketId::new(ticket_id),
        )
        .await
    }

    /// Offers `offerer`'s ticket in exchange for `target`'s
    ///
    /// # Errors
    ///
    /// `NoTicketHeld` if the offerer holds nothing, `InvalidTarget` if the
    /// target is the offerer.
    pub async fn offer_swap(&self, target: Address, offerer: Address) -> Result<(), OfficeError> {
        self.execute(RegistryAction::OfferSwap { offerer, target }, |_| ())
            .await
    }

    /// Withdraws `offerer`'s pending swap offer
    ///
    /// # Errors
    ///
    /// `NoPendingOffer` if there is none.
    pub async fn cancel_swap(&self, offerer: Address) -> Result<(), OfficeError> {
        self.execute(RegistryAction::CancelSwap { offerer }, |_| ())
            .await
    }

    /// Accepts the swap `offerer` offered to `accepter`
    ///
    /// # Errors
    ///
    /// `NoPendingOffer`, `OfferMismatch` or `NoTicketHeld`, checked in that order.
    pub async fn accept_swap(&self, offerer: Address, accepter: Address) -> Result<(), OfficeError> {
        self.execute(RegistryAction::AcceptSwap { offerer, accepter }, |_| ())
            .await
    }

    /// Returns `holder`'s ticket, moving its price to the owner's balance
    ///
    /// Returns the amount moved.
    ///
    /// # Errors
    ///
    /// `NoTicketHeld` if the holder has no ticket.
    pub async fn return_ticket(&self, holder: Address) -> Result<Wei, OfficeError> {
        self.execute(RegistryAction::ReturnTicket { holder }, RegistryState::ticket_price)
            .await
    }

    /// Pays out the owner's balance to `caller`, returning the amount
    ///
    /// # Errors
    ///
    /// `NotOwner` if `caller` did not create the sale, `NothingToWithdraw`
    /// if the balance is zero.
    pub async fn withdraw_funds(&self, caller: Address) -> Result<Wei, OfficeError> {
        self.execute(RegistryAction::WithdrawFunds { caller }, |state| {
            match state.last_event() {
                Some(RegistryAction::FundsWithdrawn { amount, .. }) => *amount,
                _ => Wei::ZERO,
            }
        })
        .await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Status of `ticket_id`
    ///
    /// # Errors
    ///
    /// `InvalidTicket` for ids outside `[1, total_tickets]`.
    pub async fn ticket_status(&self, ticket_id: u32) -> Result<TicketStatus, OfficeError> {
        Ok(self.store.state(|s| s.ticket_status(ticket_id)).await?)
    }

    /// Ticket held by `address`, 0 if none
    pub async fn ticket_of(&self, address: &Address) -> u32 {
        self.store.state(|s| s.ticket_of(address)).await
    }

    /// Same as [`TicketOffice::ticket_of`]
    pub async fn get_ticket_of(&self, address: &Address) -> u32 {
        self.ticket_of(address).await
    }

    /// Number of tickets in the sale
    pub async fn total_tickets(&self) -> u32 {
        self.store.state(RegistryState::total_tickets).await
    }

    /// Price of one ticket
    pub async fn ticket_price(&self) -> Wei {
        self.store.state(RegistryState::ticket_price).await
    }

    /// Sale creator
    pub async fn owner(&self) -> Address {
        self.store.state(RegistryState::owner).await
    }

    /// Funds held for sold tickets
    pub async fn collected_funds(&self) -> Wei {
        self.store.state(RegistryState::collected_funds).await
    }

    /// Balance the owner can withdraw
    pub async fn owner_balance(&self) -> Wei {
        self.store.state(RegistryState::owner_balance).await
    }

    /// Pending swap offer made by `address`
    pub async fn pending_swap_of(&self, address: &Address) -> Option<Address> {
        self.store.state(|s| s.pending_swap_of(address)).await
    }

    /// Number of tickets still for sale
    pub async fn available_tickets(&self) -> u32 {
        self.store.state(RegistryState::available_tickets).await
    }

    /// Copy of the committed event journal
    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.store.state(|s| s.journal().to_vec()).await
    }

    /// Rejection reason of the most recent command, if it failed
    pub async fn last_error(&self) -> Option<RegistryError> {
        self.store.state(|s| s.last_error.clone()).await
    }

    /// Summary of the sale
    pub async fn summary(&self) -> SaleSummary {
        self.store
            .state(|s| SaleSummary {
                total_tickets: s.total_tickets(),
                ticket_price: s.ticket_price(),
                owner: s.owner(),
                available: s.available_tickets(),
                sold: s.count_with_status(TicketStatus::Sold),
                refunded: s.count_with_status(TicketStatus::Refunded),
                collected_funds: s.collected_funds(),
                owner_balance: s.owner_balance(),
                withdrawn_funds: s.withdrawn_funds(),
                journal_length: s.journal().len(),
                undelivered_events: s.undelivered_events(),
            })
            .await
    }

    /// Stops accepting commands and waits for pending publications
    ///
    /// # Errors
    ///
    /// `ShutdownTimeout` if publications are still running when the
    /// configured timeout expires.
    pub async fn shutdown(&self) -> Result<(), OfficeError> {
        Ok(self.store.shutdown_gracefully().await?)
    }
}

impl std::fmt::Debug for TicketOffice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketOffice").finish_non_exhaustive()
    }
}
