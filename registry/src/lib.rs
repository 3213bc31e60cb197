//! # Ticket Sale
//!
//! A fixed supply of numbered tickets sold at a fixed price. Holders may swap
//! tickets with each other by offer and acceptance, or return a ticket, which
//! moves its price to a balance only the sale owner can withdraw.
//!
//! The registry is a reducer hosted in a [`Store`](ticket_sale_runtime::Store):
//! every operation is applied atomically and in a single total order, every
//! accepted operation is journaled and published as an event, and a rejected
//! operation leaves the registry untouched.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ticket_sale::{Address, RegistryEnvironment, SaleConfig, TicketOffice, TracingEventBus, Wei};
//! use ticket_sale_core::environment::SystemClock;
//!
//! let env = RegistryEnvironment::new(Arc::new(SystemClock), Arc::new(TracingEventBus), "ticket-sale-events");
//! let office = TicketOffice::new(&SaleConfig::default(), env);
//!
//! let alice = Address::from_low_u64(1);
//! office.buy_ticket(1, Wei::new(100), alice).await?;
//! assert_eq!(office.ticket_of(&alice).await, 1);
//! ```

pub mod actions;
pub mod config;
pub mod environment;
pub mod error;
pub mod office;
pub mod reducer;
pub mod types;

pub use actions::RegistryAction;
pub use config::{ConfigError, SaleConfig};
pub use environment::{DEFAULT_EVENT_TOPIC, RegistryEnvironment, TracingEventBus};
pub use error::{ErrorCategory, OfficeError, RegistryError};
pub use office::{RegistryStore, SaleSummary, TicketOffice};
pub use reducer::RegistryReducer;
pub use types::{
    Account, Address, JournalEntry, ParseAddressError, RegistryState, Ticket, TicketId,
    TicketStatus, Wei,
};
