//! Signal dispatch use case.
//!
//! Turns an inbound alert into one entry-order task per linked broker
//! account. Validation (signal status, trading window) happens inline so the
//! webhook can report the outcome; everything that talks to the broker runs
//! on the dispatch queue afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::application::dto::SignalAlert;
use crate::application::ports::{
    BrokerGateway, OrderLedger, PlaceOrderRequest, SignalLog, SignalStore, TokenProvider,
};
use crate::domain::order::{Order, OrderStatus, TxnType};
use crate::domain::signal::{LinkedAccount, Signal, TradingWindow, market_now};
use crate::infrastructure::queue::{QueueTask, TaskError, TaskQueue};

use super::{broker_task_error, token_task_error};

/// What dispatch did with an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Entry tasks were queued, one per linked account.
    Queued {
        /// Number of accounts fanned out to.
        accounts: usize,
    },
    /// The alert arrived outside the trading window and was ignored.
    OutsideWindow,
    /// The signal exists but is not ACTIVE.
    SignalNotLive,
    /// No signal with that id.
    UnknownSignal,
}

/// One queued entry order for one broker account.
///
/// The exclusion key is `symbol_token:client_id`, so two alerts for the same
/// instrument on the same account never race, while different accounts and
/// instruments dispatch in parallel.
pub struct EntryOrderTask<B, T, L> {
    broker: Arc<B>,
    tokens: Arc<T>,
    ledger: Arc<L>,
    signal: Signal,
    account: LinkedAccount,
    txn_type: TxnType,
}

#[async_trait]
impl<B, T, L> QueueTask for EntryOrderTask<B, T, L>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
{
    fn exclusion_key(&self) -> Option<String> {
        Some(format!(
            "{}:{}",
            self.signal.symbol_token, self.account.client_id
        ))
    }

    fn describe(&self) -> String {
        format!(
            "entry {} {} x{} for {}",
            self.txn_type, self.signal.symbol, self.signal.size, self.account.client_id
        )
    }

    async fn run(&self) -> Result<(), TaskError> {
        let session = self
            .tokens
            .session(&self.account.broker_account_id)
            .await
            .map_err(token_task_error)?;

        // Skip if the account already holds an unresolved position in this
        // instrument; stacking a second entry on top would double exposure.
        let positions = self
            .broker
            .positions(&session)
            .await
            .map_err(broker_task_error)?;
        if positions
            .iter()
            .any(|p| p.symbol_token == self.signal.symbol_token && p.is_unresolved())
        {
            tracing::info!(
                signal_id = %self.signal.id,
                client_id = %self.account.client_id,
                symbol = %self.signal.symbol,
                "unresolved position exists, entry skipped"
            );
            return Ok(());
        }

        let quantity = i64::from(self.signal.size) * i64::from(self.signal.lot_size);
        let request = PlaceOrderRequest::market_entry(
            &self.signal.exchange,
            &self.signal.symbol,
            self.signal.symbol_token.clone(),
            self.txn_type,
            quantity,
        );
        let ack = self
            .broker
            .place_order(&session, &request)
            .await
            .map_err(broker_task_error)?;

        tracing::info!(
            signal_id = %self.signal.id,
            client_id = %self.account.client_id,
            order_id = %ack.order_id,
            symbol = %self.signal.symbol,
            txn_type = %self.txn_type,
            quantity,
            "entry order placed"
        );

        let now = Utc::now();
        let order = Order {
            broker_order_id: ack.order_id,
            unique_order_id: ack.unique_order_id,
            parent_order_id: None,
            txn_type: self.txn_type,
            variety: request.variety,
            order_type: request.order_type,
            product_type: request.product_type,
            exchange: self.signal.exchange.clone(),
            symbol: self.signal.symbol.clone(),
            symbol_token: self.signal.symbol_token.clone(),
            qty: self.signal.size,
            lot_size: self.signal.lot_size,
            filled_shares: 0,
            unfilled_shares: quantity,
            price: Decimal::ZERO,
            average_price: Decimal::ZERO,
            status: OrderStatus::Pending,
            user_id: self.signal.user_id.clone(),
            signal_id: self.signal.id.clone(),
            broker_account_id: self.account.broker_account_id.clone(),
            client_id: self.account.client_id.clone(),
            created_at: now,
            updated_at: now,
        };
        // The order is already live at the broker; a retry would place it
        // again, so a failed insert is fatal and only logged.
        self.ledger
            .insert(&order)
            .await
            .map_err(|e| TaskError::Fatal(format!("ledger insert after placement: {e}")))?;

        Ok(())
    }
}

/// Use case for handling a signal alert webhook.
pub struct DispatchSignalUseCase<B, T, L, S, G>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore,
    G: SignalLog,
{
    broker: Arc<B>,
    tokens: Arc<T>,
    ledger: Arc<L>,
    signals: Arc<S>,
    signal_log: Arc<G>,
    queue: TaskQueue<EntryOrderTask<B, T, L>>,
    window: TradingWindow,
}

impl<B, T, L, S, G> DispatchSignalUseCase<B, T, L, S, G>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore,
    G: SignalLog,
{
    /// Create the use case around an already-built dispatch queue.
    pub fn new(
        broker: Arc<B>,
        tokens: Arc<T>,
        ledger: Arc<L>,
        signals: Arc<S>,
        signal_log: Arc<G>,
        queue: TaskQueue<EntryOrderTask<B, T, L>>,
        window: TradingWindow,
    ) -> Self {
        Self {
            broker,
            tokens,
            ledger,
            signals,
            signal_log,
            queue,
            window,
        }
    }

    /// Handle an alert at the current exchange time.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the signal lookup itself fails; every
    /// other failure mode is an [`DispatchOutcome`] variant.
    pub async fn execute(
        &self,
        alert: SignalAlert,
    ) -> Result<DispatchOutcome, crate::application::ports::LedgerError> {
        self.execute_at(alert, market_now()).await
    }

    /// Handle an alert as of the given exchange-local time.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the signal lookup itself fails.
    pub async fn execute_at(
        &self,
        alert: SignalAlert,
        now: NaiveTime,
    ) -> Result<DispatchOutcome, crate::application::ports::LedgerError> {
        let Some(signal) = self.signals.find(&alert.signal_id).await? else {
            tracing::warn!(signal_id = %alert.signal_id, "alert for unknown signal ignored");
            return Ok(DispatchOutcome::UnknownSignal);
        };

        // Audit trail records every authenticated alert, including the ones
        // gated off below; it is best effort and never blocks dispatch.
        if let Err(error) = self
            .signal_log
            .append(&signal.id, &signal.user_id, alert.raw.clone())
            .await
        {
            tracing::warn!(signal_id = %signal.id, error = %error, "signal log append failed");
        }

        if !signal.is_live() {
            tracing::info!(
                signal_id = %signal.id,
                status = signal.status.as_str(),
                "alert for non-live signal ignored"
            );
            return Ok(DispatchOutcome::SignalNotLive);
        }

        if !self.window.contains(now) {
            tracing::info!(
                signal_id = %signal.id,
                time = %now,
                "alert outside trading window ignored"
            );
            return Ok(DispatchOutcome::OutsideWindow);
        }

        let accounts = signal.accounts.len();
        for account in &signal.accounts {
            self.queue.enqueue(EntryOrderTask {
                broker: Arc::clone(&self.broker),
                tokens: Arc::clone(&self.tokens),
                ledger: Arc::clone(&self.ledger),
                signal: signal.clone(),
                account: account.clone(),
                txn_type: alert.txn_type,
            });
        }
        tracing::info!(
            signal_id = %signal.id,
            txn_type = %alert.txn_type,
            accounts,
            "entry orders queued"
        );
        Ok(DispatchOutcome::Queued { accounts })
    }

    /// Wait for all queued entry tasks to finish. Used for graceful drain.
    pub async fn drained(&self) {
        self.queue.drained().await;
    }
}
