//! Signal bounded context.
//!
//! A signal is a user-configured trading rule: an instrument, sizing, and
//! target/stop-loss parameters that inbound webhook alerts trigger against.
//! The execution pipeline reads signals; it never mutates them.

pub mod trading_window;

pub use trading_window::{TradingWindow, market_now};

use serde::{Deserialize, Serialize};

use crate::domain::shared::{BrokerAccountId, ClientId, SignalId, SymbolToken, UserId};

/// Lifecycle status of a signal. Only ACTIVE signals dispatch orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    /// Created but not yet armed.
    Draft,
    /// Live; webhook alerts place orders.
    Active,
    /// Temporarily disabled by the user.
    Inactive,
    /// Retired; kept for history only.
    Archived,
}

impl SignalStatus {
    /// Parse a status string as stored in the ledger.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "ACTIVE" => Self::Active,
            "INACTIVE" => Self::Inactive,
            "ARCHIVED" => Self::Archived,
            _ => Self::Draft,
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Archived => "ARCHIVED",
        }
    }
}

/// How the target/stop-loss values of a signal are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketMode {
    /// Values are absolute points added to / subtracted from the entry price.
    Points,
    /// Values are a percentage of the entry price.
    Percentage,
}

impl BracketMode {
    /// Parse a mode string as stored in the ledger.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == "PERCENTAGE" {
            Self::Percentage
        } else {
            Self::Points
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "POINTS",
            Self::Percentage => "PERCENTAGE",
        }
    }
}

/// A broker account a signal fans out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    /// Internal broker account id.
    pub broker_account_id: BrokerAccountId,
    /// Broker-side client code.
    pub client_id: ClientId,
}

/// A user-configured trading rule triggered by webhook alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal id; doubles as the webhook key.
    pub id: SignalId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Exchange the instrument trades on (NSE, BSE, ...).
    pub exchange: String,
    /// Trading symbol, e.g. `SBIN-EQ`.
    pub symbol: String,
    /// Broker instrument token for the symbol.
    pub symbol_token: SymbolToken,
    /// Shares per lot for the instrument.
    pub lot_size: u32,
    /// Order size in lots.
    pub size: u32,
    /// Target value, interpreted per `mode`.
    pub target: rust_decimal::Decimal,
    /// Stop-loss value, interpreted per `mode`.
    pub stop_loss: rust_decimal::Decimal,
    /// Interpretation of `target` / `stop_loss`.
    pub mode: BracketMode,
    /// Lifecycle status.
    pub status: SignalStatus,
    /// Broker accounts this signal dispatches to.
    pub accounts: Vec<LinkedAccount>,
}

impl Signal {
    /// Whether webhook alerts against this signal should place orders.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status == SignalStatus::Active
    }
}
