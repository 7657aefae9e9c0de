//! Persistence ports: order ledger, signal store, signal log.

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::domain::shared::{BrokerOrderId, ClientId, SignalId, UserId};
use crate::domain::signal::Signal;

/// Errors from the persistence layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Connection failure.
    #[error("ledger connection error: {0}")]
    Connection(String),

    /// Query failure.
    #[error("ledger query error: {0}")]
    Query(String),

    /// A stored row could not be decoded.
    #[error("ledger row decode error: {0}")]
    Decode(String),
}

/// Durable record of every broker order ever placed.
///
/// Writes are scoped to a single order row; no cross-row transaction is
/// required for pipeline correctness.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Insert a freshly placed order.
    async fn insert(&self, order: &Order) -> Result<(), LedgerError>;

    /// Look up an order by broker order id and client code.
    async fn find_by_broker_order(
        &self,
        order_id: &BrokerOrderId,
        client_id: &ClientId,
    ) -> Result<Option<Order>, LedgerError>;

    /// Persist postback-applied changes (status, fills, prices).
    async fn update(&self, order: &Order) -> Result<(), LedgerError>;

    /// All children of a parent order not yet EXECUTED or CANCELED.
    async fn open_children(&self, parent: &BrokerOrderId) -> Result<Vec<Order>, LedgerError>;

    /// Mark an order CANCELED.
    async fn mark_canceled(&self, order_id: &BrokerOrderId) -> Result<(), LedgerError>;
}

/// Read access to signal configurations.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Load a signal with its linked accounts; `None` if the id is unknown.
    async fn find(&self, id: &SignalId) -> Result<Option<Signal>, LedgerError>;
}

/// Append-only audit trail of accepted webhook payloads.
///
/// Best-effort: failures are logged by callers and never block dispatch.
#[async_trait]
pub trait SignalLog: Send + Sync {
    /// Record one accepted payload.
    async fn append(
        &self,
        signal_id: &SignalId,
        user_id: &UserId,
        payload: serde_json::Value,
    ) -> Result<(), LedgerError>;
}
