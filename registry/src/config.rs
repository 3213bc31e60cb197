//! Configuration for a ticket sale.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::environment::DEFAULT_EVENT_TOPIC;
use crate::types::{Address, Wei};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Errors found when validating a [`SaleConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A sale needs at least one ticket
    #[error("total_tickets must be greater than zero")]
    ZeroTickets,

    /// Tickets must cost something
    #[error("ticket_price must be greater than zero")]
    ZeroPrice,

    /// Events need somewhere to go
    #[error("event_topic must not be empty")]
    EmptyTopic,
}

/// Ticket sale configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Number of tickets, ids `1..=total_tickets`
    pub total_tickets: u32,
    /// Price of one ticket
    pub ticket_price: Wei,
    /// Address creating the sale
    pub owner: Address,
    /// Topic committed events are published to
    pub event_topic: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl SaleConfig {
    /// Creates a configuration with the given sale terms and default settings
    #[must_use]
    pub fn new(total_tickets: u32, ticket_price: Wei, owner: Address) -> Self {
        Self {
            total_tickets,
            ticket_price,
            owner,
            event_topic: DEFAULT_EVENT_TOPIC.to_string(),
            shutdown_timeout: 30,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            total_tickets: env::var("TICKET_SALE_TOTAL_TICKETS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            ticket_price: env::var("TICKET_SALE_TICKET_PRICE")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(Wei::new(100), Wei::new),
            owner: env::var("TICKET_SALE_OWNER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Address::ZERO),
            event_topic: env::var("TICKET_SALE_EVENT_TOPIC")
                .unwrap_or_else(|_| DEFAULT_EVENT_TOPIC.to_string()),
            shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Check the sale terms
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_tickets == 0 {
            return Err(ConfigError::ZeroTickets);
        }
        if self.ticket_price.is_zero() {
            return Err(ConfigError::ZeroPrice);
        }
        if self.event_topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        Ok(())
    }

    /// Shutdown timeout as a `Duration`
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self::new(10, Wei::new(100), Address::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SaleConfig::default();
        assert_eq!(config.total_tickets, 10);
        assert_eq!(config.ticket_price, Wei::new(100));
        assert_eq!(config.event_topic, "ticket-sale-events");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validation() {
        let mut config = SaleConfig::new(0, Wei::new(100), Address::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickets));

        config.total_tickets = 5;
        config.ticket_price = Wei::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPrice));

        config.ticket_price = Wei::new(1);
        config.event_topic.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyTopic));
    }
}
