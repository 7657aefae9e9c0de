//! HTTP request DTOs.
//!
//! Webhook payloads arrive from third parties (charting platforms, the
//! broker's postback service) and are parsed leniently: numeric fields may
//! be strings and the transaction side may be any case.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::dto::{OrderPostbackEvent, SignalAlert};
use crate::domain::order::{OrderStatus, TxnType};
use crate::domain::shared::{BrokerOrderId, ClientId, SignalId};
use crate::infrastructure::broker::angelone::api_types::{lenient_decimal, lenient_i64};

/// Alert payload posted by the signal source.
///
/// The signal itself is identified by the webhook `key` query parameter,
/// not the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAlertRequest {
    /// Requested side; any casing of BUY/SELL.
    pub txn_type: String,
}

impl SignalAlertRequest {
    /// Validate into the application-level alert.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response when the side is not
    /// BUY or SELL.
    pub fn into_alert(self, signal_id: SignalId) -> Result<SignalAlert, String> {
        let raw = serde_json::json!({
            "key": signal_id.as_str(),
            "txnType": self.txn_type,
        });
        let txn_type = TxnType::parse(&self.txn_type)
            .ok_or_else(|| format!("invalid txnType: {}", self.txn_type))?;
        Ok(SignalAlert {
            signal_id,
            txn_type,
            raw,
        })
    }
}

/// Broker order postback payload.
///
/// Field names follow the broker's wire format; quantities and prices come
/// in as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPostbackRequest {
    /// Broker order id.
    pub orderid: String,
    /// Client code the order belongs to.
    pub clientcode: String,
    /// Broker status string, e.g. `complete` or `trigger pending`.
    #[serde(default, alias = "status")]
    pub orderstatus: String,
    /// Cumulative filled shares.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub filledshares: i64,
    /// Order price.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    /// Average fill price.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub averageprice: Decimal,
}

impl OrderPostbackRequest {
    /// Validate into the application-level event.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response when required ids are
    /// missing.
    pub fn into_event(self) -> Result<OrderPostbackEvent, String> {
        if self.orderid.trim().is_empty() {
            return Err("missing orderid".to_string());
        }
        if self.clientcode.trim().is_empty() {
            return Err("missing clientcode".to_string());
        }
        let status = OrderStatus::from_broker_status(&self.orderstatus);
        Ok(OrderPostbackEvent {
            order_id: BrokerOrderId::new(self.orderid),
            client_id: ClientId::new(self.clientcode),
            status_text: self.orderstatus,
            status,
            reported_filled: self.filledshares,
            price: self.price,
            average_price: self.averageprice,
        })
    }
}
