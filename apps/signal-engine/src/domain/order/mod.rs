//! Order execution bounded context.
//!
//! The `Order` aggregate is one ledger row per broker order ever placed.
//! Value objects mirror the broker's order taxonomy; the state machine
//! enforces the monotone forward lifecycle.

pub mod aggregate;
pub mod errors;
pub mod state_machine;
pub mod value_objects;

pub use aggregate::{Order, PostbackUpdate};
pub use errors::OrderError;
pub use state_machine::OrderStateMachine;
pub use value_objects::{OrderStatus, OrderType, OrderVariety, ProductType, TxnType};
