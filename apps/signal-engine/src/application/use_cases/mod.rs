//! Application use cases.
//!
//! The pipeline has two halves: dispatching entry orders from signal alerts,
//! and reconciling order state from broker postbacks. Both run their broker
//! work as queued tasks so webhook handlers return immediately and failures
//! stay contained.

mod dispatch_signal;
mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatch_signal::{DispatchOutcome, DispatchSignalUseCase, EntryOrderTask};
pub use reconcile::{PostbackPipeline, ReconcileCommand, ReconcileTask, ReconcileUseCase};

use crate::application::ports::{BrokerError, LedgerError, TokenError};
use crate::infrastructure::queue::TaskError;

/// Classify a broker error for the task retry loop.
pub(crate) fn broker_task_error(error: BrokerError) -> TaskError {
    if error.is_retryable() {
        TaskError::Retryable(error.to_string())
    } else {
        TaskError::Fatal(error.to_string())
    }
}

/// Classify a token error: only token-service outages are worth retrying.
pub(crate) fn token_task_error(error: TokenError) -> TaskError {
    match error {
        TokenError::Service(message) => TaskError::Retryable(message),
        other => TaskError::Fatal(other.to_string()),
    }
}

/// Ledger errors are treated as transient.
pub(crate) fn ledger_task_error(error: LedgerError) -> TaskError {
    TaskError::Retryable(error.to_string())
}
