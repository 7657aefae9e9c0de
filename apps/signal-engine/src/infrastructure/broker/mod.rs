//! Broker adapters.

pub mod angelone;
