//! Order value objects mirroring the broker's order taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnType {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl TxnType {
    /// The opposite side; bracket children always exit the entry's position.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Parse a side string, case-insensitive.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broker order variety controlling how the order is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderVariety {
    /// Regular order.
    Normal,
    /// Stop-loss order (carries a trigger price).
    Stoploss,
    /// Broker-managed bracket order.
    Robo,
    /// After-market order.
    Amo,
}

impl OrderVariety {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Stoploss => "STOPLOSS",
            Self::Robo => "ROBO",
            Self::Amo => "AMO",
        }
    }

    /// Parse a variety string as stored in the ledger.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "STOPLOSS" => Self::Stoploss,
            "ROBO" => Self::Robo,
            "AMO" => Self::Amo,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for OrderVariety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution type of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order.
    Market,
    /// Limit order.
    Limit,
    /// Stop-loss market order, fires at the trigger price.
    StoplossMarket,
    /// Stop-loss limit order.
    StoplossLimit,
}

impl OrderType {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
            Self::StoplossMarket => "STOPLOSS_MARKET",
            Self::StoplossLimit => "STOPLOSS_LIMIT",
        }
    }

    /// Parse an order-type string; unknown values fall back to MARKET.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "LIMIT" => Self::Limit,
            "STOPLOSS_MARKET" => Self::StoplossMarket,
            "STOPLOSS_LIMIT" => Self::StoplossLimit,
            _ => Self::Market,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product type controlling margining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Cash and carry for equity.
    Delivery,
    /// Normal for futures and options.
    Carryforward,
    /// Margin delivery.
    Margin,
    /// Margin intraday squareoff; the pipeline's entry product.
    Intraday,
    /// Bracket order product (ROBO only).
    Bo,
}

impl ProductType {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "DELIVERY",
            Self::Carryforward => "CARRYFORWARD",
            Self::Margin => "MARGIN",
            Self::Intraday => "INTRADAY",
            Self::Bo => "BO",
        }
    }

    /// Parse a product-type string; unknown values fall back to INTRADAY.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "DELIVERY" => Self::Delivery,
            "CARRYFORWARD" => Self::Carryforward,
            "MARGIN" => Self::Margin,
            "BO" => Self::Bo,
            _ => Self::Intraday,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status in the ledger lifecycle.
///
/// Transitions are monotone forward: PENDING -> OPEN / TRIGGER_PENDING ->
/// EXECUTED | CANCELED. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted by us, not yet confirmed working at the exchange.
    Pending,
    /// Working at the exchange.
    Open,
    /// Stop order waiting for its trigger price.
    TriggerPending,
    /// Completely filled.
    Executed,
    /// Canceled or rejected.
    Canceled,
}

impl OrderStatus {
    /// Map a free-text broker status string to the ledger status.
    ///
    /// Unrecognized statuses map to PENDING: a status we cannot interpret
    /// must never terminate an order.
    #[must_use]
    pub fn from_broker_status(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "open" | "modified" | "open pending" | "modify pending" => Self::Open,
            "trigger pending" => Self::TriggerPending,
            "complete" | "executed" | "filled" => Self::Executed,
            "cancelled" | "canceled" | "rejected" => Self::Canceled,
            _ => Self::Pending,
        }
    }

    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Canceled)
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::TriggerPending => "TRIGGER_PENDING",
            Self::Executed => "EXECUTED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Parse a status string as stored in the ledger.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "OPEN" => Self::Open,
            "TRIGGER_PENDING" => Self::TriggerPending,
            "EXECUTED" => Self::Executed,
            "CANCELED" => Self::Canceled,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
