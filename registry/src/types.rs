//! Domain types for the ticket sale registry.
//!
//! Value objects (addresses, amounts, ticket ids), the per-ticket and
//! per-account records, and [`RegistryState`], the single owned value the
//! store guards.

use crate::actions::RegistryAction;
use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Value Objects
// ============================================================================

/// A 20-byte account address, written as `0x`-prefixed lowercase hex.
///
/// # Example
///
/// ```
/// use ticket_sale::Address;
///
/// let address: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
/// assert_eq!(address, Address::from_low_u64(255));
/// assert_eq!(address.to_string(), "0x00000000000000000000000000000000000000ff");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Self = Self([0; 20]);

    /// Creates an `Address` from raw bytes
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an `Address` whose low eight bytes hold `value` (big-endian)
    #[must_use]
    pub const fn from_low_u64(value: u64) -> Self {
        let low = value.to_be_bytes();
        let mut bytes = [0; 20];
        let mut i = 0;
        while i < 8 {
            bytes[12 + i] = low[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Whether this is the all-zero address
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Error returned when parsing an [`Address`] from text fails
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAddressError {
    /// Missing `0x` prefix
    #[error("address must start with 0x")]
    MissingPrefix,

    /// Wrong number of hex digits
    #[error("address must have 40 hex digits, found {0}")]
    InvalidLength(usize),

    /// A character that is not a hex digit
    #[error("invalid hex digit '{0}' in address")]
    InvalidDigit(char),
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(ParseAddressError::MissingPrefix)?;

        if digits.len() != 40 {
            return Err(ParseAddressError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 20];
        let mut chars = digits.chars();
        for byte in &mut bytes {
            let mut nibble = || -> Result<u32, ParseAddressError> {
                let c = chars.next().ok_or(ParseAddressError::InvalidLength(digits.len()))?;
                c.to_digit(16)
                    .ok_or(ParseAddressError::InvalidDigit(c))
            };
            let (high, low) = (nibble()?, nibble()?);
            // Note: both nibbles are < 16, the combined value fits a byte
            #[allow(clippy::cast_possible_truncation)]
            {
                *byte = ((high << 4) | low) as u8;
            }
        }

        Ok(Self(bytes))
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = ParseAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An amount of the ledger's native currency in its smallest unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wei(u128);

impl Wei {
    /// Zero wei
    pub const ZERO: Self = Self(0);

    /// Creates a new `Wei` amount
    #[must_use]
    pub const fn new(amount: u128) -> Self {
        Self(amount)
    }

    /// Returns the raw amount
    #[must_use]
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, returning `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` if it exceeds `self`
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(difference) => Some(Self(difference)),
            None => None,
        }
    }

    /// Adds two amounts, saturating at the maximum
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts `other`, saturating at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies by a count, saturating at the maximum
    #[must_use]
    pub const fn saturating_mul(self, count: u128) -> Self {
        Self(self.0.saturating_mul(count))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Identifier of a ticket, in `[1, total_tickets]`
///
/// The value 0 is reserved on the external surface for "no ticket" and is
/// never a valid `TicketId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(u32);

impl TicketId {
    /// Creates a new `TicketId` without range checking
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a ticket
///
/// `Available → Sold → Refunded`; `Refunded` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Never sold
    #[default]
    Available,
    /// Sold and currently owned
    Sold,
    /// Returned for a refund
    Refunded,
}

impl TicketStatus {
    /// Numeric status code: 0 = Available, 1 = Sold, 2 = Refunded
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Available => 0,
            Self::Sold => 1,
            Self::Refunded => 2,
        }
    }

    /// Parses a numeric status code
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Available),
            1 => Some(Self::Sold),
            2 => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Sold => write!(f, "Sold"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A single ticket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Current status
    pub status: TicketStatus,
    /// Current owner, only while `Sold`
    pub owner: Option<Address>,
}

/// Per-address record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Ticket currently held (at most one)
    pub held_ticket: Option<TicketId>,
    /// Outstanding swap offer made by this account
    pub pending_swap: Option<Address>,
}

/// A committed event with its position in the journal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, starting at 1
    pub sequence: u64,
    /// Clock time at which the event was committed
    pub recorded_at: DateTime<Utc>,
    /// The event
    pub event: RegistryAction,
}

// ============================================================================
// State
// ============================================================================

/// State of one ticket sale
///
/// Tickets and accounts are created lazily: a ticket id in range that was
/// never touched is `Available` and ownerless, and an unknown address holds
/// nothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryState {
    pub(crate) total_tickets: u32,
    pub(crate) ticket_price: Wei,
    pub(crate) owner: Address,
    pub(crate) tickets: BTreeMap<TicketId, Ticket>,
    pub(crate) accounts: HashMap<Address, Account>,
    pub(crate) collected_funds: Wei,
    pub(crate) owner_balance: Wei,
    pub(crate) withdrawn_funds: Wei,
    pub(crate) journal: Vec<JournalEntry>,
    pub(crate) undelivered_events: u64,
    /// Rejection reason of the most recent command, cleared by the next success
    pub last_error: Option<RegistryError>,
}

impl RegistryState {
    /// Creates a sale of `total_tickets` tickets at `ticket_price`, created by `owner`
    #[must_use]
    pub fn new(total_tickets: u32, ticket_price: Wei, owner: Address) -> Self {
        Self {
            total_tickets,
            ticket_price,
            owner,
            tickets: BTreeMap::new(),
            accounts: HashMap::new(),
            collected_funds: Wei::ZERO,
            owner_balance: Wei::ZERO,
            withdrawn_funds: Wei::ZERO,
            journal: Vec::new(),
            undelivered_events: 0,
            last_error: None,
        }
    }

    /// Number of tickets, fixed at creation
    #[must_use]
    pub const fn total_tickets(&self) -> u32 {
        self.total_tickets
    }

    /// Price of every ticket, fixed at creation
    #[must_use]
    pub const fn ticket_price(&self) -> Wei {
        self.ticket_price
    }

    /// Address that created the sale
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Funds held for tickets currently sold
    #[must_use]
    pub const fn collected_funds(&self) -> Wei {
        self.collected_funds
    }

    /// Price of returned tickets, withdrawable by the owner
    #[must_use]
    pub const fn owner_balance(&self) -> Wei {
        self.owner_balance
    }

    /// Amount the owner has already withdrawn
    #[must_use]
    pub const fn withdrawn_funds(&self) -> Wei {
        self.withdrawn_funds
    }

    /// Number of committed events whose publication ultimately failed
    #[must_use]
    pub const fn undelivered_events(&self) -> u64 {
        self.undelivered_events
    }

    /// Validates a raw ticket id against `[1, total_tickets]`
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidTicket`] for ids outside the range.
    pub const fn checked_ticket_id(&self, ticket_id: u32) -> Result<TicketId, RegistryError> {
        if ticket_id == 0 || ticket_id > self.total_tickets {
            return Err(RegistryError::InvalidTicket {
                ticket_id,
                total_tickets: self.total_tickets,
            });
        }
        Ok(TicketId::new(ticket_id))
    }

    /// The ticket record, or the default for a never-touched ticket
    #[must_use]
    pub fn ticket(&self, ticket_id: TicketId) -> Ticket {
        self.tickets.get(&ticket_id).copied().unwrap_or_default()
    }

    /// The account record, or the default for an unknown address
    #[must_use]
    pub fn account(&self, address: &Address) -> Account {
        self.accounts.get(address).copied().unwrap_or_default()
    }

    /// Status of a ticket
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidTicket`] for ids outside `[1, total_tickets]`.
    pub fn ticket_status(&self, ticket_id: u32) -> Result<TicketStatus, RegistryError> {
        let ticket_id = self.checked_ticket_id(ticket_id)?;
        Ok(self.ticket(ticket_id).status)
    }

    /// Ticket held by `address`, or 0 if none
    #[must_use]
    pub fn ticket_of(&self, address: &Address) -> u32 {
        self.account(address)
            .held_ticket
            .map_or(0, |ticket_id| ticket_id.value())
    }

    /// Outstanding swap offer made by `address`
    #[must_use]
    pub fn pending_swap_of(&self, address: &Address) -> Option<Address> {
        self.account(address).pending_swap
    }

    /// Number of tickets in `[1, total_tickets]` with the given status
    #[must_use]
    pub fn count_with_status(&self, status: TicketStatus) -> u32 {
        let in_range = self
            .tickets
            .iter()
            .filter(|(id, _)| (1..=self.total_tickets).contains(&id.value()));

        let mut touched = 0_u32;
        let mut matching = 0_u32;
        for (_, ticket) in in_range {
            touched = touched.saturating_add(1);
            if ticket.status == status {
                matching = matching.saturating_add(1);
            }
        }

        if status == TicketStatus::Available {
            // Untouched tickets are implicitly available
            matching.saturating_add(self.total_tickets.saturating_sub(touched))
        } else {
            matching
        }
    }

    /// Number of tickets still available for purchase
    #[must_use]
    pub fn available_tickets(&self) -> u32 {
        self.count_with_status(TicketStatus::Available)
    }

    /// Total held by the sale: collected funds plus the owner's balance
    #[must_use]
    pub const fn balance(&self) -> Wei {
        self.collected_funds.saturating_add(self.owner_balance)
    }

    /// All touched tickets, in id order
    pub fn tickets(&self) -> impl Iterator<Item = (TicketId, &Ticket)> {
        self.tickets.iter().map(|(id, ticket)| (*id, ticket))
    }

    /// All known accounts
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    /// Committed events, oldest first
    #[must_use]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// The most recently committed event
    #[must_use]
    pub fn last_event(&self) -> Option<&RegistryAction> {
        self.journal.last().map(|entry| &entry.event)
    }

    pub(crate) fn ticket_mut(&mut self, ticket_id: TicketId) -> &mut Ticket {
        self.tickets.entry(ticket_id).or_default()
    }

    pub(crate) fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    pub(crate) fn record(&mut self, event: RegistryAction, recorded_at: DateTime<Utc>) {
        let sequence = self.journal.len() as u64 + 1;
        self.journal.push(JournalEntry {
            sequence,
            recorded_at,
            event,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_address_round_trips_through_text() {
        let address = Address::from_low_u64(0xdead_beef);
        let text = address.to_string();
        assert_eq!(text, "0x00000000000000000000000000000000deadbeef");
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_address_parse_errors() {
        assert_eq!(
            "deadbeef".parse::<Address>(),
            Err(ParseAddressError::MissingPrefix)
        );
        assert_eq!(
            "0xdeadbeef".parse::<Address>(),
            Err(ParseAddressError::InvalidLength(8))
        );
        assert_eq!(
            "0x000000000000000000000000000000000000000g".parse::<Address>(),
            Err(ParseAddressError::InvalidDigit('g'))
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TicketStatus::Available.code(), 0);
        assert_eq!(TicketStatus::Sold.code(), 1);
        assert_eq!(TicketStatus::Refunded.code(), 2);
        assert_eq!(TicketStatus::from_code(2), Some(TicketStatus::Refunded));
        assert_eq!(TicketStatus::from_code(3), None);
    }

    #[test]
    fn test_ticket_id_range() {
        let state = RegistryState::new(10, Wei::new(100), Address::ZERO);

        assert!(state.checked_ticket_id(0).is_err());
        assert!(state.checked_ticket_id(11).is_err());
        assert_eq!(state.checked_ticket_id(10).unwrap(), TicketId::new(10));
        assert_eq!(
            state.ticket_status(11),
            Err(RegistryError::InvalidTicket {
                ticket_id: 11,
                total_tickets: 10
            })
        );
    }

    #[test]
    fn test_lazy_records() {
        let state = RegistryState::new(3, Wei::new(100), Address::ZERO);
        let stranger = Address::from_low_u64(42);

        assert_eq!(state.ticket_status(2).unwrap(), TicketStatus::Available);
        assert_eq!(state.ticket_of(&stranger), 0);
        assert_eq!(state.pending_swap_of(&stranger), None);
        assert_eq!(state.available_tickets(), 3);
        assert!(state.journal().is_empty());
    }

    #[test]
    fn test_counts_ignore_out_of_range_records() {
        let mut state = RegistryState::new(1, Wei::new(100), Address::ZERO);
        state.ticket_mut(TicketId::new(1)).status = TicketStatus::Sold;
        state.ticket_mut(TicketId::new(5)).status = TicketStatus::Sold;

        assert_eq!(state.available_tickets(), 0);
        assert_eq!(state.count_with_status(TicketStatus::Sold), 1);
    }

    #[test]
    fn test_wei_arithmetic() {
        let a = Wei::new(100);
        assert_eq!(a.checked_sub(Wei::new(101)), None);
        assert_eq!(a.saturating_sub(Wei::new(101)), Wei::ZERO);
        assert_eq!(a.checked_add(Wei::new(1)), Some(Wei::new(101)));
        assert_eq!(a.saturating_mul(3), Wei::new(300));
        assert_eq!(a.to_string(), "100 wei");
    }
}
