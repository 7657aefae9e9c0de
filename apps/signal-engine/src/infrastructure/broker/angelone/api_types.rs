//! AngelOne API request and response types.
//!
//! The API wraps every response in a `{status, message, errorcode, data}`
//! envelope and reports most numeric fields as strings (`"filledshares":
//! "74"`), so the response types deserialize numbers from either form.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::application::ports::{LtpQuote, OrderAck, PlaceOrderRequest, PositionSnapshot};
use crate::domain::shared::{BrokerOrderId, SymbolToken};

/// Standard AngelOne response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// True on success.
    pub status: bool,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
    /// Error code; empty on success.
    #[serde(default)]
    pub errorcode: String,
    /// Payload; absent or null on failure.
    #[serde(default = "none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

/// Deserialize a `Decimal` that may arrive as a JSON string or number.
///
/// Empty and missing values decode to zero.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(Decimal),
        None,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Num(n) => Ok(n),
        Raw::None => Ok(Decimal::ZERO),
    }
}

/// Deserialize an `i64` that may arrive as a JSON string or number.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
        None,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) if s.trim().is_empty() => Ok(0),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Num(n) => Ok(n),
        Raw::None => Ok(0),
    }
}

/// Body for `placeOrder`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderParams {
    pub(crate) variety: String,
    pub(crate) tradingsymbol: String,
    pub(crate) symboltoken: String,
    pub(crate) transactiontype: String,
    pub(crate) exchange: String,
    pub(crate) ordertype: String,
    pub(crate) producttype: String,
    pub(crate) duration: String,
    pub(crate) price: String,
    pub(crate) squareoff: String,
    pub(crate) stoploss: String,
    pub(crate) quantity: String,
    pub(crate) triggerprice: String,
    pub(crate) ordertag: String,
}

impl From<&PlaceOrderRequest> for PlaceOrderParams {
    fn from(request: &PlaceOrderRequest) -> Self {
        Self {
            variety: request.variety.as_str().to_string(),
            tradingsymbol: request.symbol.clone(),
            symboltoken: request.symbol_token.as_str().to_string(),
            transactiontype: request.txn_type.as_str().to_string(),
            exchange: request.exchange.clone(),
            ordertype: request.order_type.as_str().to_string(),
            producttype: request.product_type.as_str().to_string(),
            duration: request.duration.clone(),
            price: request.price.to_string(),
            squareoff: request.squareoff.to_string(),
            stoploss: request.stoploss.to_string(),
            quantity: request.quantity.to_string(),
            triggerprice: request.trigger_price.to_string(),
            ordertag: request.order_tag.clone(),
        }
    }
}

/// `placeOrder` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderData {
    /// Broker order id.
    pub orderid: String,
    /// Secondary unique id for the order, when present.
    #[serde(default)]
    pub uniqueorderid: Option<String>,
}

impl PlaceOrderData {
    /// Convert to the port-level acknowledgment.
    #[must_use]
    pub fn into_order_ack(self) -> OrderAck {
        OrderAck {
            order_id: BrokerOrderId::new(self.orderid),
            unique_order_id: self.uniqueorderid,
        }
    }
}

/// Body for `cancelOrder`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderParams {
    pub(crate) variety: String,
    pub(crate) orderid: String,
}

/// `cancelOrder` response data; only echoed ids.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderData {
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) orderid: String,
}

/// Body for `getLtpData`.
#[derive(Debug, Clone, Serialize)]
pub struct LtpParams {
    pub(crate) exchange: String,
    pub(crate) tradingsymbol: String,
    pub(crate) symboltoken: String,
}

/// `getLtpData` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct LtpData {
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub(crate) ltp: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub(crate) open: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub(crate) high: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub(crate) low: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub(crate) close: Decimal,
}

impl LtpData {
    /// Convert to the port-level quote.
    #[must_use]
    pub const fn into_quote(self) -> LtpQuote {
        LtpQuote {
            ltp: self.ltp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }
}

/// One row of the `getPosition` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionData {
    #[serde(default)]
    pub(crate) symboltoken: String,
    #[serde(default)]
    pub(crate) tradingsymbol: String,
    #[serde(deserialize_with = "lenient_i64", default)]
    pub(crate) buyqty: i64,
    #[serde(deserialize_with = "lenient_i64", default)]
    pub(crate) sellqty: i64,
}

impl PositionData {
    /// Convert to the port-level snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> PositionSnapshot {
        PositionSnapshot {
            symbol_token: SymbolToken::new(self.symboltoken),
            symbol: self.tradingsymbol,
            buy_qty: self.buyqty,
            sell_qty: self.sellqty,
        }
    }
}
