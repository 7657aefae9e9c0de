//! Application layer.
//!
//! Orchestrates the domain through use cases behind ports:
//!
//! - **Ports**: interfaces to the broker, token service, and storage
//! - **Use cases**: signal dispatch and postback reconciliation
//! - **DTOs**: typed payloads crossing the API boundary

pub mod dto;
pub mod ports;
pub mod use_cases;

pub use dto::*;
pub use ports::*;
pub use use_cases::*;
