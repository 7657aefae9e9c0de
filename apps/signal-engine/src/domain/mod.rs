//! Domain layer: pure business logic with no I/O.

pub mod order;
pub mod pricing;
pub mod shared;
pub mod signal;
