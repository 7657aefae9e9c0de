//! Infrastructure layer.
//!
//! Adapters for the ports defined in the application layer, following
//! hexagonal architecture:
//!
//! - **Driven adapters (outbound)**:
//!   - `broker/`: AngelOne SmartAPI adapter
//!   - `token/`: token service client for broker sessions
//!   - `persistence/`: SQLite order ledger and signal store
//! - **Driver adapters (inbound)**:
//!   - `http/`: webhook controllers
//! - **Cross-cutting**:
//!   - `queue/`: task queues with retry and per-key exclusion

pub mod broker;
pub mod http;
pub mod persistence;
pub mod queue;
pub mod token;
