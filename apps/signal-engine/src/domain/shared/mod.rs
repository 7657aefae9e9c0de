//! Shared domain primitives used across bounded contexts.

pub mod identifiers;

pub use identifiers::{BrokerAccountId, BrokerOrderId, ClientId, SignalId, SymbolToken, UserId};
