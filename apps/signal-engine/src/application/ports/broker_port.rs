//! Broker gateway port.
//!
//! Interface for placing and cancelling orders and reading market state at
//! the broker. Every call is authenticated with a per-account session from
//! the token provider.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderType, OrderVariety, ProductType, TxnType};
use crate::domain::shared::{BrokerOrderId, SymbolToken};

use super::token_port::BrokerSession;

/// Order tag attached to every pipeline-placed order, so broker-side books
/// distinguish automated orders from manual ones.
pub const ORDER_TAG: &str = "ALS";

/// A fully-specified order to place at the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Order variety.
    pub variety: OrderVariety,
    /// Execution type.
    pub order_type: OrderType,
    /// Product type.
    pub product_type: ProductType,
    /// Order duration (DAY / IOC).
    pub duration: String,
    /// Exchange code.
    pub exchange: String,
    /// Trading symbol.
    pub symbol: String,
    /// Broker instrument token.
    pub symbol_token: SymbolToken,
    /// Transaction side.
    pub txn_type: TxnType,
    /// Quantity in shares.
    pub quantity: i64,
    /// Limit price; zero for market orders.
    pub price: Decimal,
    /// Trigger price; zero unless a stop order.
    pub trigger_price: Decimal,
    /// Squareoff value (ROBO only); zero otherwise.
    pub squareoff: Decimal,
    /// Stop-loss value (ROBO only); zero otherwise.
    pub stoploss: Decimal,
    /// Order tag for broker-side books.
    pub order_tag: String,
}

impl PlaceOrderRequest {
    /// A NORMAL/MARKET/INTRADAY entry order.
    #[must_use]
    pub fn market_entry(
        exchange: &str,
        symbol: &str,
        symbol_token: SymbolToken,
        txn_type: TxnType,
        quantity: i64,
    ) -> Self {
        Self {
            variety: OrderVariety::Normal,
            order_type: OrderType::Market,
            product_type: ProductType::Intraday,
            duration: "DAY".to_string(),
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            symbol_token,
            txn_type,
            quantity,
            price: Decimal::ZERO,
            trigger_price: Decimal::ZERO,
            squareoff: Decimal::ZERO,
            stoploss: Decimal::ZERO,
            order_tag: ORDER_TAG.to_string(),
        }
    }

    /// A LIMIT target child priced at the take-profit level.
    #[must_use]
    pub fn target_child(
        exchange: &str,
        symbol: &str,
        symbol_token: SymbolToken,
        txn_type: TxnType,
        quantity: i64,
        target_price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: target_price,
            ..Self::market_entry(exchange, symbol, symbol_token, txn_type, quantity)
        }
    }

    /// A STOPLOSS_MARKET child triggered at the stop level.
    #[must_use]
    pub fn stop_loss_child(
        exchange: &str,
        symbol: &str,
        symbol_token: SymbolToken,
        txn_type: TxnType,
        quantity: i64,
        trigger_price: Decimal,
    ) -> Self {
        Self {
            variety: OrderVariety::Stoploss,
            order_type: OrderType::StoplossMarket,
            trigger_price,
            ..Self::market_entry(exchange, symbol, symbol_token, txn_type, quantity)
        }
    }
}

/// Broker acknowledgment of a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker-assigned order id.
    pub order_id: BrokerOrderId,
    /// Broker's secondary unique order id, when provided.
    pub unique_order_id: Option<String>,
}

/// Last-traded-price snapshot for an instrument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LtpQuote {
    /// Last traded price.
    pub ltp: Decimal,
    /// Session open.
    pub open: Decimal,
    /// Session high.
    pub high: Decimal,
    /// Session low.
    pub low: Decimal,
    /// Previous close.
    pub close: Decimal,
}

/// One row of the broker's live position book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Broker instrument token.
    pub symbol_token: SymbolToken,
    /// Trading symbol.
    pub symbol: String,
    /// Shares bought this session.
    pub buy_qty: i64,
    /// Shares sold this session.
    pub sell_qty: i64,
}

impl PositionSnapshot {
    /// An unresolved position still holds inventory on one side.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        self.buy_qty != self.sell_qty
    }
}

/// Errors from the broker gateway.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// The session token was rejected.
    #[error("broker rejected the session token")]
    Auth,

    /// The broker API returned a failure envelope.
    #[error("broker api error {code}: {message}")]
    Api {
        /// Broker error code.
        code: String,
        /// Broker error message.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("broker http error: status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level failure.
    #[error("broker network error: {0}")]
    Network(String),

    /// The broker responded with something other than JSON.
    #[error("broker returned non-json response: {0}")]
    JsonParse(String),
}

impl BrokerError {
    /// Whether a bounded retry is worthwhile.
    ///
    /// Auth failures are not: the token will not become valid by waiting.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth)
    }
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Place an order, returning the broker's ids.
    async fn place_order(
        &self,
        session: &BrokerSession,
        request: &PlaceOrderRequest,
    ) -> Result<OrderAck, BrokerError>;

    /// Cancel a working order.
    async fn cancel_order(
        &self,
        session: &BrokerSession,
        variety: OrderVariety,
        order_id: &BrokerOrderId,
    ) -> Result<(), BrokerError>;

    /// Fetch the live LTP snapshot for an instrument.
    async fn ltp(
        &self,
        session: &BrokerSession,
        exchange: &str,
        symbol: &str,
        symbol_token: &SymbolToken,
    ) -> Result<LtpQuote, BrokerError>;

    /// Fetch the account's live position book.
    async fn positions(
        &self,
        session: &BrokerSession,
    ) -> Result<Vec<PositionSnapshot>, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_entry_defaults() {
        let request = PlaceOrderRequest::market_entry(
            "NSE",
            "SBIN-EQ",
            SymbolToken::new("3045"),
            TxnType::Buy,
            10,
        );
        assert_eq!(request.variety, OrderVariety::Normal);
        assert_eq!(request.order_type, OrderType::Market);
        assert_eq!(request.product_type, ProductType::Intraday);
        assert_eq!(request.duration, "DAY");
        assert_eq!(request.price, Decimal::ZERO);
        assert_eq!(request.trigger_price, Decimal::ZERO);
        assert_eq!(request.order_tag, ORDER_TAG);
    }

    #[test]
    fn target_child_is_limit_at_price() {
        let request = PlaceOrderRequest::target_child(
            "NSE",
            "SBIN-EQ",
            SymbolToken::new("3045"),
            TxnType::Sell,
            10,
            dec!(102.00),
        );
        assert_eq!(request.order_type, OrderType::Limit);
        assert_eq!(request.variety, OrderVariety::Normal);
        assert_eq!(request.price, dec!(102.00));
        assert_eq!(request.trigger_price, Decimal::ZERO);
    }

    #[test]
    fn stop_loss_child_is_trigger_order() {
        let request = PlaceOrderRequest::stop_loss_child(
            "NSE",
            "SBIN-EQ",
            SymbolToken::new("3045"),
            TxnType::Sell,
            10,
            dec!(99.00),
        );
        assert_eq!(request.order_type, OrderType::StoplossMarket);
        assert_eq!(request.variety, OrderVariety::Stoploss);
        assert_eq!(request.trigger_price, dec!(99.00));
        assert_eq!(request.price, Decimal::ZERO);
    }

    #[test]
    fn unresolved_position_detection() {
        let open = PositionSnapshot {
            symbol_token: SymbolToken::new("3045"),
            symbol: "SBIN-EQ".to_string(),
            buy_qty: 10,
            sell_qty: 0,
        };
        let flat = PositionSnapshot {
            symbol_token: SymbolToken::new("3045"),
            symbol: "SBIN-EQ".to_string(),
            buy_qty: 10,
            sell_qty: 10,
        };
        assert!(open.is_unresolved());
        assert!(!flat.is_unresolved());
    }

    #[test]
    fn auth_errors_are_not_retryable() {
        assert!(!BrokerError::Auth.is_retryable());
        assert!(BrokerError::Network("timeout".to_string()).is_retryable());
        assert!(BrokerError::Http { status: 503 }.is_retryable());
    }
}
