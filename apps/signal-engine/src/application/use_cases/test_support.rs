//! Hand-rolled port mocks shared by the use case tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{
    BrokerError, BrokerGateway, BrokerSession, LedgerError, LtpQuote, OrderAck, OrderLedger,
    PlaceOrderRequest, PositionSnapshot, SignalLog, SignalStore, TokenError, TokenProvider,
};
use crate::domain::order::{Order, OrderStatus, OrderType, OrderVariety, ProductType, TxnType};
use crate::domain::shared::{
    BrokerAccountId, BrokerOrderId, ClientId, SignalId, SymbolToken, UserId,
};
use crate::domain::signal::{BracketMode, LinkedAccount, Signal, SignalStatus};

pub(crate) fn sample_signal(id: &str, status: SignalStatus) -> Signal {
    Signal {
        id: SignalId::new(id),
        user_id: UserId::new("user-1"),
        name: "SBIN intraday".to_string(),
        exchange: "NSE".to_string(),
        symbol: "SBIN-EQ".to_string(),
        symbol_token: SymbolToken::new("3045"),
        lot_size: 1,
        size: 10,
        target: dec!(2),
        stop_loss: dec!(1),
        mode: BracketMode::Points,
        status,
        accounts: vec![LinkedAccount {
            broker_account_id: BrokerAccountId::new("acct-1"),
            client_id: ClientId::new("D12345"),
        }],
    }
}

pub(crate) fn entry_order(order_id: &str) -> Order {
    let now = Utc::now();
    Order {
        broker_order_id: BrokerOrderId::new(order_id),
        unique_order_id: None,
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

/// Broker mock that records every call and can be pre-loaded with failures.
#[derive(Default)]
pub(crate) struct ScriptedBroker {
    pub placed: Mutex<Vec<PlaceOrderRequest>>,
    pub canceled: Mutex<Vec<(OrderVariety, BrokerOrderId)>>,
    pub positions: Mutex<Vec<PositionSnapshot>>,
    pub ltp: Mutex<Decimal>,
    pub place_failures: Mutex<Vec<BrokerError>>,
    pub cancel_failures: Mutex<Vec<BrokerError>>,
    next_id: AtomicU64,
    position_calls: AtomicUsize,
}

impl ScriptedBroker {
    pub(crate) fn position_calls(&self) -> usize {
        self.position_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerGateway for ScriptedBroker {
    async fn place_order(
        &self,
        _session: &BrokerSession,
        request: &PlaceOrderRequest,
    ) -> Result<OrderAck, BrokerError> {
        {
            let mut failures = self.place_failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }
        self.placed.lock().unwrap().push(request.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OrderAck {
            order_id: BrokerOrderId::new(format!("mock-{n}")),
            unique_order_id: Some(format!("uniq-{n}")),
        })
    }

    async fn cancel_order(
        &self,
        _session: &BrokerSession,
        variety: OrderVariety,
        order_id: &BrokerOrderId,
    ) -> Result<(), BrokerError> {
        {
            let mut failures = self.cancel_failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }
        self.canceled.lock().unwrap().push((variety, order_id.clone()));
        Ok(())
    }

    async fn ltp(
        &self,
        _session: &BrokerSession,
        _exchange: &str,
        _symbol: &str,
        _symbol_token: &SymbolToken,
    ) -> Result<LtpQuote, BrokerError> {
        let ltp = *self.ltp.lock().unwrap();
        Ok(LtpQuote {
            ltp,
            open: ltp,
            high: ltp,
            low: ltp,
            close: ltp,
        })
    }

    async fn positions(
        &self,
        _session: &BrokerSession,
    ) -> Result<Vec<PositionSnapshot>, BrokerError> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.positions.lock().unwrap().clone())
    }
}

/// Token provider that always hands out the same session, or a scripted error.
#[derive(Default)]
pub(crate) struct StaticTokens {
    pub fail: Mutex<Option<TokenError>>,
}

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn session(&self, _account: &BrokerAccountId) -> Result<BrokerSession, TokenError> {
        if let Some(error) = self.fail.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(BrokerSession {
            client_id: ClientId::new("D12345"),
            auth_token: "jwt-test".to_string(),
        })
    }
}

/// In-memory order ledger keyed by broker order id.
#[derive(Default)]
pub(crate) struct MemoryLedger {
    orders: Mutex<HashMap<String, Order>>,
}

impl MemoryLedger {
    pub(crate) fn seed(&self, order: Order) {
        self.orders
            .lock()
            .unwrap()
            .insert(order.broker_order_id.as_str().to_string(), order);
    }

    pub(crate) fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Order> {
        self.orders.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn children_of(&self, parent: &str) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| {
                o.parent_order_id
                    .as_ref()
                    .is_some_and(|p| p.as_str() == parent)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderLedger for MemoryLedger {
    async fn insert(&self, order: &Order) -> Result<(), LedgerError> {
        self.seed(order.clone());
        Ok(())
    }

    async fn find_by_broker_order(
        &self,
        order_id: &BrokerOrderId,
        client_id: &ClientId,
    ) -> Result<Option<Order>, LedgerError> {
        Ok(self
            .get(order_id.as_str())
            .filter(|o| &o.client_id == client_id))
    }

    async fn update(&self, order: &Order) -> Result<(), LedgerError> {
        self.seed(order.clone());
        Ok(())
    }

    async fn open_children(&self, parent: &BrokerOrderId) -> Result<Vec<Order>, LedgerError> {
        Ok(self
            .children_of(parent.as_str())
            .into_iter()
            .filter(|o| !o.status.is_terminal())
            .collect())
    }

    async fn mark_canceled(&self, order_id: &BrokerOrderId) -> Result<(), LedgerError> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders.get_mut(order_id.as_str()) {
            order.status = OrderStatus::Canceled;
            order.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Signal store backed by a fixed map.
pub(crate) struct RecordingSignals {
    signals: HashMap<String, Signal>,
}

impl RecordingSignals {
    pub(crate) fn with(signals: Vec<Signal>) -> Self {
        Self {
            signals: signals
                .into_iter()
                .map(|s| (s.id.as_str().to_string(), s))
                .collect(),
        }
    }
}

#[async_trait]
impl SignalStore for RecordingSignals {
    async fn find(&self, id: &SignalId) -> Result<Option<Signal>, LedgerError> {
        Ok(self.signals.get(id.as_str()).cloned())
    }
}

/// Signal log that just collects appended payloads.
#[derive(Default)]
pub(crate) struct RecordingLog {
    pub entries: Mutex<Vec<(SignalId, serde_json::Value)>>,
}

#[async_trait]
impl SignalLog for RecordingLog {
    async fn append(
        &self,
        signal_id: &SignalId,
        _user_id: &UserId,
        payload: serde_json::Value,
    ) -> Result<(), LedgerError> {
        self.entries
            .lock()
            .unwrap()
            .push((signal_id.clone(), payload));
        Ok(())
    }
}
