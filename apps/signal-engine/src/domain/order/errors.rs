//! Order domain errors.

use thiserror::Error;

use super::value_objects::OrderStatus;

/// Errors raised by the order aggregate and state machine.
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    /// A status transition that the lifecycle does not allow.
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// A fill that would exceed the order quantity.
    #[error("fill of {shares} shares exceeds {unfilled} unfilled")]
    Overfill {
        /// Shares in the offending fill.
        shares: i64,
        /// Unfilled shares remaining on the order.
        unfilled: i64,
    },
}
