//! The `Order` aggregate: one ledger record per broker order ever placed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{BrokerAccountId, BrokerOrderId, ClientId, SignalId, SymbolToken, UserId};

use super::state_machine::OrderStateMachine;
use super::value_objects::{OrderStatus, OrderType, OrderVariety, ProductType, TxnType};

/// A broker order as recorded in the ledger.
///
/// Invariants maintained by [`Order::apply_postback`]:
/// - `filled_shares + unfilled_shares` is conserved as fills accrue;
/// - status only moves forward, never out of a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Broker-assigned order id, unique per broker account.
    pub broker_order_id: BrokerOrderId,
    /// Broker's secondary unique order id, when provided.
    pub unique_order_id: Option<String>,
    /// Parent order id; set for bracket children and exit orders.
    pub parent_order_id: Option<BrokerOrderId>,
    /// Transaction side.
    pub txn_type: TxnType,
    /// Order variety.
    pub variety: OrderVariety,
    /// Execution type.
    pub order_type: OrderType,
    /// Product type.
    pub product_type: ProductType,
    /// Exchange code.
    pub exchange: String,
    /// Trading symbol.
    pub symbol: String,
    /// Broker instrument token.
    pub symbol_token: SymbolToken,
    /// Order size in lots.
    pub qty: u32,
    /// Shares per lot.
    pub lot_size: u32,
    /// Shares filled so far.
    pub filled_shares: i64,
    /// Shares still unfilled.
    pub unfilled_shares: i64,
    /// Order price (0 for market orders); trigger price for stop orders.
    pub price: Decimal,
    /// Average fill price reported by the broker.
    pub average_price: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Owning user.
    pub user_id: UserId,
    /// Signal that produced this order.
    pub signal_id: SignalId,
    /// Broker account the order was placed on.
    pub broker_account_id: BrokerAccountId,
    /// Broker-side client code.
    pub client_id: ClientId,
    /// Ledger insert time.
    pub created_at: DateTime<Utc>,
    /// Last postback-applied time.
    pub updated_at: DateTime<Utc>,
}

/// The fields of a broker postback that mutate an order.
#[derive(Debug, Clone)]
pub struct PostbackUpdate {
    /// Status mapped from the broker's free-text status string.
    pub status: OrderStatus,
    /// Cumulative filled shares the broker reports.
    pub reported_filled: i64,
    /// Order price from the postback.
    pub price: Decimal,
    /// Average fill price from the postback.
    pub average_price: Decimal,
}

/// What a postback actually changed on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedUpdate {
    /// Shares newly filled by this event (0 for duplicates / replays).
    pub shares_filled: i64,
    /// True if this event moved the order into EXECUTED.
    pub newly_executed: bool,
}

impl Order {
    /// Total shares this order is for.
    #[must_use]
    pub const fn total_shares(&self) -> i64 {
        self.qty as i64 * self.lot_size as i64
    }

    /// Whether this is a pipeline entry order (parentless intraday market).
    #[must_use]
    pub fn is_entry(&self) -> bool {
        self.parent_order_id.is_none()
            && self.order_type == OrderType::Market
            && self.product_type == ProductType::Intraday
    }

    /// Whether this is a bracket child (target or stop-loss leg).
    #[must_use]
    pub fn is_bracket_child(&self) -> bool {
        self.parent_order_id.is_some()
            && matches!(
                self.order_type,
                OrderType::StoplossMarket | OrderType::Limit
            )
    }

    /// Delta between the broker's cumulative fill count and ours.
    ///
    /// Negative or zero for duplicate and out-of-order postbacks.
    #[must_use]
    pub const fn fill_delta(&self, reported_filled: i64) -> i64 {
        reported_filled - self.filled_shares
    }

    /// Apply a broker postback to this order.
    ///
    /// Only positive fill deltas are applied, so duplicate or out-of-order
    /// postbacks that report fewer filled shares than already recorded are
    /// harmless. Status changes that would move the order backwards (or out
    /// of a terminal state) are ignored.
    pub fn apply_postback(&mut self, update: &PostbackUpdate, now: DateTime<Utc>) -> AppliedUpdate {
        let was_executed = self.status == OrderStatus::Executed;

        let delta = self.fill_delta(update.reported_filled);
        let shares_filled = if delta > 0 {
            // Clamp at the unfilled remainder so the share count stays conserved
            // even if the broker over-reports.
            let applied = delta.min(self.unfilled_shares);
            self.filled_shares += applied;
            self.unfilled_shares -= applied;
            applied
        } else {
            0
        };

        if OrderStateMachine::is_valid_transition(self.status, update.status) {
            self.status = update.status;
        }

        if update.price > Decimal::ZERO {
            self.price = update.price;
        }
        if update.average_price > Decimal::ZERO {
            self.average_price = update.average_price;
        }
        self.updated_at = now;

        AppliedUpdate {
            shares_filled,
            newly_executed: !was_executed && self.status == OrderStatus::Executed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry_order() -> Order {
        let now = Utc::now();
        Order {
            broker_order_id: BrokerOrderId::new("ord-1"),
            unique_order_id: Some("uniq-1".to_string()),
            parent_order_id: None,
            txn_type: TxnType::Buy,
            variety: OrderVariety::Normal,
            order_type: OrderType::Market,
            product_type: ProductType::Intraday,
            exchange: "NSE".to_string(),
            symbol: "SBIN-EQ".to_string(),
            symbol_token: SymbolToken::new("3045"),
            qty: 10,
            lot_size: 1,
            filled_shares: 0,
            unfilled_shares: 10,
            price: Decimal::ZERO,
            average_price: Decimal::ZERO,
            status: OrderStatus::Pending,
            user_id: UserId::new("user-1"),
            signal_id: SignalId::new("sig-1"),
            broker_account_id: BrokerAccountId::new("acct-1"),
            client_id: ClientId::new("D12345"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn entry_detection() {
        let order = entry_order();
        assert!(order.is_entry());
        assert!(!order.is_bracket_child());

        let mut child = entry_order();
        child.parent_order_id = Some(BrokerOrderId::new("ord-0"));
        child.order_type = OrderType::Limit;
        assert!(child.is_bracket_child());
        assert!(!child.is_entry());
    }

    #[test]
    fn partial_fill_conserves_shares() {
        let mut order = entry_order();
        let applied = order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Open,
                reported_filled: 4,
                price: Decimal::ZERO,
                average_price: dec!(584.70),
            },
            Utc::now(),
        );

        assert_eq!(applied.shares_filled, 4);
        assert!(!applied.newly_executed);
        assert_eq!(order.filled_shares, 4);
        assert_eq!(order.unfilled_shares, 6);
        assert_eq!(order.filled_shares + order.unfilled_shares, 10);
        assert_eq!(order.average_price, dec!(584.70));
    }

    #[test]
    fn duplicate_postback_is_a_no_op_fill() {
        let mut order = entry_order();
        order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Open,
                reported_filled: 6,
                price: Decimal::ZERO,
                average_price: dec!(100),
            },
            Utc::now(),
        );

        // Replay of an older event reporting fewer filled shares.
        let applied = order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Open,
                reported_filled: 4,
                price: Decimal::ZERO,
                average_price: dec!(100),
            },
            Utc::now(),
        );

        assert_eq!(applied.shares_filled, 0);
        assert_eq!(order.filled_shares, 6);
        assert_eq!(order.unfilled_shares, 4);
    }

    #[test]
    fn full_fill_marks_newly_executed_once() {
        let mut order = entry_order();
        let applied = order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Executed,
                reported_filled: 10,
                price: Decimal::ZERO,
                average_price: dec!(100.05),
            },
            Utc::now(),
        );
        assert!(applied.newly_executed);
        assert_eq!(order.status, OrderStatus::Executed);

        // Duplicate delivery of the same terminal postback.
        let replay = order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Executed,
                reported_filled: 10,
                price: Decimal::ZERO,
                average_price: dec!(100.05),
            },
            Utc::now(),
        );
        assert!(!replay.newly_executed);
        assert_eq!(replay.shares_filled, 0);
    }

    #[test]
    fn terminal_order_never_regresses() {
        let mut order = entry_order();
        order.status = OrderStatus::Executed;
        order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Open,
                reported_filled: 0,
                price: Decimal::ZERO,
                average_price: Decimal::ZERO,
            },
            Utc::now(),
        );
        assert_eq!(order.status, OrderStatus::Executed);
    }

    #[test]
    fn over_reported_fill_is_clamped() {
        let mut order = entry_order();
        let applied = order.apply_postback(
            &PostbackUpdate {
                status: OrderStatus::Executed,
                reported_filled: 25,
                price: Decimal::ZERO,
                average_price: dec!(100),
            },
            Utc::now(),
        );
        assert_eq!(applied.shares_filled, 10);
        assert_eq!(order.filled_shares, 10);
        assert_eq!(order.unfilled_shares, 0);
    }

    #[test]
    fn total_shares_uses_lot_size() {
        let mut order = entry_order();
        order.qty = 3;
        order.lot_size = 25;
        assert_eq!(order.total_shares(), 75);
    }
}
