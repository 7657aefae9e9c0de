//! Postback reconciliation use case.
//!
//! Broker postbacks arrive over the webhook and are applied strictly in
//! arrival order on a serial queue. Applying an event is pure ledger work;
//! anything that must then talk to the broker (placing bracket children,
//! cancelling siblings) is enqueued as a follow-up task on the same queue so
//! webhook handling never waits on the broker.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::application::dto::OrderPostbackEvent;
use crate::application::ports::{
    BrokerGateway, OrderAck, OrderLedger, PlaceOrderRequest, SignalStore, TokenProvider,
};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::pricing::{compute_bracket_prices, level_already_crossed};
use crate::infrastructure::queue::{QueueTask, RetryPolicy, TaskError, TaskQueue};

use super::{broker_task_error, ledger_task_error, token_task_error};

/// A unit of reconciliation work.
#[derive(Debug, Clone)]
pub enum ReconcileCommand {
    /// Apply one broker postback to the ledger.
    Postback(OrderPostbackEvent),
    /// An entry order just filled; place its bracket children.
    EntryFilled(Box<Order>),
    /// A bracket child just executed; cancel its siblings.
    ResolveSiblings(Box<Order>),
}

/// Reconciliation logic shared by all queued commands.
pub struct ReconcileUseCase<B, T, L, S> {
    broker: Arc<B>,
    tokens: Arc<T>,
    ledger: Arc<L>,
    signals: Arc<S>,
}

impl<B, T, L, S> ReconcileUseCase<B, T, L, S>
where
    B: BrokerGateway,
    T: TokenProvider,
    L: OrderLedger,
    S: SignalStore,
{
    /// Create the use case.
    pub fn new(broker: Arc<B>, tokens: Arc<T>, ledger: Arc<L>, signals: Arc<S>) -> Self {
        Self {
            broker,
            tokens,
            ledger,
            signals,
        }
    }

    /// Apply one postback to the ledger.
    ///
    /// Returns the follow-up command the event triggered, if any. Postbacks
    /// for orders the ledger does not know (manual orders, other systems)
    /// are ignored.
    async fn handle_postback(
        &self,
        event: &OrderPostbackEvent,
    ) -> Result<Option<ReconcileCommand>, TaskError> {
        let Some(mut order) = self
            .ledger
            .find_by_broker_order(&event.order_id, &event.client_id)
            .await
            .map_err(ledger_task_error)?
        else {
            tracing::debug!(
                order_id = %event.order_id,
                client_id = %event.client_id,
                "postback for unknown order ignored"
            );
            return Ok(None);
        };

        let applied = order.apply_postback(&event.update(), Utc::now());
        self.ledger.update(&order).await.map_err(ledger_task_error)?;
        tracing::info!(
            order_id = %order.broker_order_id,
            status = %order.status,
            broker_status = %event.status_text,
            shares_filled = applied.shares_filled,
            "postback applied"
        );

        if !applied.newly_executed {
            return Ok(None);
        }
        if order.is_entry() {
            return Ok(Some(ReconcileCommand::EntryFilled(Box::new(order))));
        }
        if order.is_bracket_child() {
            return Ok(Some(ReconcileCommand::ResolveSiblings(Box::new(order))));
        }
        // A market exit filling closes the position; nothing left to do.
        Ok(None)
    }

    /// Place bracket children for a freshly filled entry order.
    ///
    /// If the market has already moved past either bracket level, placing
    /// the pair would fill one leg instantly; the position is exited with a
    /// single market order instead.
    async fn place_bracket(&self, entry: &Order) -> Result<(), TaskError> {
        let signal = self
            .signals
            .find(&entry.signal_id)
            .await
            .map_err(ledger_task_error)?
            .ok_or_else(|| {
                TaskError::Fatal(format!("signal {} gone for filled entry", entry.signal_id))
            })?;
        let session = self
            .tokens
            .session(&entry.broker_account_id)
            .await
            .map_err(token_task_error)?;
        let quote = self
            .broker
            .ltp(&session, &entry.exchange, &entry.symbol, &entry.symbol_token)
            .await
            .map_err(broker_task_error)?;

        let basis = if entry.average_price > Decimal::ZERO {
            entry.average_price
        } else {
            quote.ltp
        };
        let prices =
            compute_bracket_prices(basis, signal.target, signal.stop_loss, signal.mode, entry.txn_type);
        let exit_side = entry.txn_type.opposite();
        let quantity = entry.total_shares();

        if level_already_crossed(quote.ltp, prices, entry.txn_type) {
            tracing::info!(
                order_id = %entry.broker_order_id,
                ltp = %quote.ltp,
                target = %prices.target_price,
                stop_loss = %prices.stop_loss_price,
                "bracket level already crossed, exiting at market"
            );
            let request = PlaceOrderRequest::market_entry(
                &entry.exchange,
                &entry.symbol,
                entry.symbol_token.clone(),
                exit_side,
                quantity,
            );
            let ack = self
                .broker
                .place_order(&session, &request)
                .await
                .map_err(broker_task_error)?;
            self.insert_child(entry, &ack, &request).await?;
            return Ok(());
        }

        let target_request = PlaceOrderRequest::target_child(
            &entry.exchange,
            &entry.symbol,
            entry.symbol_token.clone(),
            exit_side,
            quantity,
            prices.target_price,
        );
        let target_ack = self
            .broker
            .place_order(&session, &target_request)
            .await
            .map_err(broker_task_error)?;
        self.insert_child(entry, &target_ack, &target_request).await?;

        // One leg is live now; a retry of this task would place it again, so
        // failures past this point are fatal rather than retried.
        let stop_request = PlaceOrderRequest::stop_loss_child(
            &entry.exchange,
            &entry.symbol,
            entry.symbol_token.clone(),
            exit_side,
            quantity,
            prices.stop_loss_price,
        );
        let stop_ack = self
            .broker
            .place_order(&session, &stop_request)
            .await
            .map_err(|e| TaskError::Fatal(format!("stop-loss leg placement: {e}")))?;
        self.insert_child(entry, &stop_ack, &stop_request).await?;

        tracing::info!(
            order_id = %entry.broker_order_id,
            target_order_id = %target_ack.order_id,
            stop_order_id = %stop_ack.order_id,
            target = %prices.target_price,
            stop_loss = %prices.stop_loss_price,
            "bracket placed"
        );
        Ok(())
    }

    /// Cancel the still-working siblings of an executed bracket child.
    async fn cancel_siblings(&self, executed: &Order) -> Result<(), TaskError> {
        let Some(parent_id) = executed.parent_order_id.as_ref() else {
            return Ok(());
        };
        let session = self
            .tokens
            .session(&executed.broker_account_id)
            .await
            .map_err(token_task_error)?;
        let children = self
            .ledger
            .open_children(parent_id)
            .await
            .map_err(ledger_task_error)?;

        let mut incomplete = false;
        for child in children {
            if child.broker_order_id == executed.broker_order_id || child.status.is_terminal() {
                continue;
            }
            match self
                .broker
                .cancel_order(&session, child.variety, &child.broker_order_id)
                .await
            {
                Ok(()) => {
                    if let Err(error) = self.ledger.mark_canceled(&child.broker_order_id).await {
                        tracing::error!(
                            order_id = %child.broker_order_id,
                            error = %error,
                            "canceled at broker but ledger update failed"
                        );
                    }
                    tracing::info!(
                        order_id = %child.broker_order_id,
                        sibling = %executed.broker_order_id,
                        "sibling order canceled"
                    );
                }
                Err(error) if error.is_retryable() => {
                    tracing::warn!(
                        order_id = %child.broker_order_id,
                        error = %error,
                        "sibling cancel failed, will retry"
                    );
                    incomplete = true;
                }
                Err(error) => {
                    tracing::error!(
                        order_id = %child.broker_order_id,
                        error = %error,
                        "sibling cancel rejected"
                    );
                }
            }
        }

        if incomplete {
            // Already-canceled children are terminal in the ledger by now,
            // so the retry only touches the ones that failed.
            return Err(TaskError::Retryable(
                "sibling cancellation incomplete".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_child(
        &self,
        parent: &Order,
        ack: &OrderAck,
        request: &PlaceOrderRequest,
    ) -> Result<(), TaskError> {
        let now = Utc::now();
        let child = Order {
            broker_order_id: ack.order_id.clone(),
            unique_order_id: ack.unique_order_id.clone(),
            parent_order_id: Some(parent.broker_order_id.clone()),
            txn_type: request.txn_type,
            variety: request.variety,
            order_type: request.order_type,
            product_type: request.product_type,
            exchange: parent.exchange.clone(),
            symbol: parent.symbol.clone(),
            symbol_token: parent.symbol_token.clone(),
            qty: parent.qty,
            lot_size: parent.lot_size,
            filled_shares: 0,
            unfilled_shares: parent.total_shares(),
            price: if request.trigger_price > Decimal::ZERO {
                request.trigger_price
            } else {
                request.price
            },
            average_price: Decimal::ZERO,
            status: OrderStatus::Pending,
            user_id: parent.user_id.clone(),
            signal_id: parent.signal_id.clone(),
            broker_account_id: parent.broker_account_id.clone(),
            client_id: parent.client_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.ledger
            .insert(&child)
            .await
            .map_err(|e| TaskError::Fatal(format!("ledger insert after placement: {e}")))
    }
}

/// One queued reconciliation command.
pub struct ReconcileTask<B, T, L, S>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
{
    use_case: Arc<ReconcileUseCase<B, T, L, S>>,
    queue: TaskQueue<Self>,
    command: ReconcileCommand,
}

#[async_trait]
impl<B, T, L, S> QueueTask for ReconcileTask<B, T, L, S>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
{
    fn describe(&self) -> String {
        match &self.command {
            ReconcileCommand::Postback(event) => format!("postback {}", event.order_id),
            ReconcileCommand::EntryFilled(order) => {
                format!("entry-filled {}", order.broker_order_id)
            }
            ReconcileCommand::ResolveSiblings(order) => {
                format!("resolve-siblings {}", order.broker_order_id)
            }
        }
    }

    async fn run(&self) -> Result<(), TaskError> {
        match &self.command {
            ReconcileCommand::Postback(event) => {
                if let Some(command) = self.use_case.handle_postback(event).await? {
                    self.queue.enqueue(Self {
                        use_case: Arc::clone(&self.use_case),
                        queue: self.queue.clone(),
                        command,
                    });
                }
                Ok(())
            }
            ReconcileCommand::EntryFilled(order) => self.use_case.place_bracket(order).await,
            ReconcileCommand::ResolveSiblings(order) => self.use_case.cancel_siblings(order).await,
        }
    }
}

/// Entry point the webhook hands postbacks to.
///
/// Wraps the serial reconciliation queue; events are applied in the order
/// they arrive regardless of how many postbacks the broker bursts at once.
pub struct PostbackPipeline<B, T, L, S>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
{
    use_case: Arc<ReconcileUseCase<B, T, L, S>>,
    queue: TaskQueue<ReconcileTask<B, T, L, S>>,
}

impl<B, T, L, S> Clone for PostbackPipeline<B, T, L, S>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            use_case: Arc::clone(&self.use_case),
            queue: self.queue.clone(),
        }
    }
}

impl<B, T, L, S> PostbackPipeline<B, T, L, S>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
{
    /// Create the pipeline with its own single-worker queue.
    #[must_use]
    pub fn new(use_case: Arc<ReconcileUseCase<B, T, L, S>>, retry: RetryPolicy) -> Self {
        Self {
            use_case,
            queue: TaskQueue::new(
                "postback",
                crate::infrastructure::queue::QueueConfig::serial(retry),
            ),
        }
    }

    /// Queue one postback for processing. Never blocks.
    pub fn submit(&self, event: OrderPostbackEvent) {
        self.queue.enqueue(ReconcileTask {
            use_case: Arc::clone(&self.use_case),
            queue: self.queue.clone(),
            command: ReconcileCommand::Postback(event),
        });
    }

    /// Wait for all queued work, including follow-ups, to finish.
    pub async fn drained(&self) {
        self.queue.drained().await;
    }
}
