//! Data transfer objects crossing the webhook boundary.

use rust_decimal::Decimal;

use crate::domain::order::{OrderStatus, PostbackUpdate, TxnType};
use crate::domain::shared::{BrokerOrderId, ClientId, SignalId};

/// A validated signal alert, ready for dispatch.
#[derive(Debug, Clone)]
pub struct SignalAlert {
    /// Signal the alert fires against.
    pub signal_id: SignalId,
    /// Requested entry side.
    pub txn_type: TxnType,
    /// Raw payload as received, kept for the audit log.
    pub raw: serde_json::Value,
}

/// A validated broker order postback.
#[derive(Debug, Clone)]
pub struct OrderPostbackEvent {
    /// Broker order id the event refers to.
    pub order_id: BrokerOrderId,
    /// Client code the order belongs to.
    pub client_id: ClientId,
    /// Broker's raw status string, kept for log lines.
    pub status_text: String,
    /// Status mapped into the order lifecycle.
    pub status: OrderStatus,
    /// Cumulative filled shares reported by the broker.
    pub reported_filled: i64,
    /// Order price from the event.
    pub price: Decimal,
    /// Average fill price from the event.
    pub average_price: Decimal,
}

impl OrderPostbackEvent {
    /// The domain-level update this event carries.
    #[must_use]
    pub fn update(&self) -> PostbackUpdate {
        PostbackUpdate {
            status: self.status,
            reported_filled: self.reported_filled,
            price: self.price,
            average_price: self.average_price,
        }
    }
}
