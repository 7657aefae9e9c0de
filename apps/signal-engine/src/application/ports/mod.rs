//! Ports: interfaces the application layer depends on.
//!
//! Driven adapters (broker HTTP client, token service, sqlite ledger) live in
//! `infrastructure` and implement these traits.

pub mod broker_port;
pub mod store_port;
pub mod token_port;

pub use broker_port::{
    BrokerError, BrokerGateway, LtpQuote, OrderAck, PlaceOrderRequest, PositionSnapshot, ORDER_TAG,
};
pub use store_port::{LedgerError, OrderLedger, SignalLog, SignalStore};
pub use token_port::{BrokerSession, TokenError, TokenProvider};
