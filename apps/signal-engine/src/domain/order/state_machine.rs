//! Order lifecycle state machine.
//!
//! Validates that ledger status transitions only ever move forward:
//! PENDING -> OPEN / TRIGGER_PENDING -> EXECUTED | CANCELED.

use super::errors::OrderError;
use super::value_objects::OrderStatus;

/// Validates order status transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a status transition is valid.
    ///
    /// Self-transitions are valid everywhere except out of terminal states;
    /// postbacks routinely repeat the current status with a new fill count.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        if from.is_terminal() {
            return false;
        }
        matches!(
            (from, to),
            (OrderStatus::Pending, _)
                | (OrderStatus::Open, OrderStatus::Open)
                | (OrderStatus::Open, OrderStatus::Executed)
                | (OrderStatus::Open, OrderStatus::Canceled)
                | (OrderStatus::TriggerPending, OrderStatus::TriggerPending)
                | (OrderStatus::TriggerPending, OrderStatus::Open)
                | (OrderStatus::TriggerPending, OrderStatus::Executed)
                | (OrderStatus::TriggerPending, OrderStatus::Canceled)
        )
    }

    /// Validate a transition, returning an error when it is not allowed.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_move_anywhere() {
        for to in [
            OrderStatus::Open,
            OrderStatus::TriggerPending,
            OrderStatus::Executed,
            OrderStatus::Canceled,
        ] {
            assert!(OrderStateMachine::is_valid_transition(
                OrderStatus::Pending,
                to
            ));
        }
    }

    #[test]
    fn open_can_complete_or_cancel() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Open,
            OrderStatus::Executed
        ));
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Open,
            OrderStatus::Canceled
        ));
    }

    #[test]
    fn open_cannot_regress_to_pending() {
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Open,
            OrderStatus::Pending
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Open,
            OrderStatus::TriggerPending
        ));
    }

    #[test]
    fn trigger_pending_can_open_when_triggered() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::TriggerPending,
            OrderStatus::Open
        ));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for from in [OrderStatus::Executed, OrderStatus::Canceled] {
            for to in [
                OrderStatus::Pending,
                OrderStatus::Open,
                OrderStatus::TriggerPending,
                OrderStatus::Executed,
                OrderStatus::Canceled,
            ] {
                assert!(
                    !OrderStateMachine::is_valid_transition(from, to),
                    "{from} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn repeated_status_is_valid_for_working_orders() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Open,
            OrderStatus::Open
        ));
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::TriggerPending,
            OrderStatus::TriggerPending
        ));
    }

    #[test]
    fn validate_transition_returns_error() {
        let result =
            OrderStateMachine::validate_transition(OrderStatus::Executed, OrderStatus::Canceled);
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Executed,
                to: OrderStatus::Canceled
            })
        ));
    }
}
