// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Signal Engine - Core Library
//!
//! Turns inbound trading signals into AngelOne broker orders with a
//! bracket (target / stop-loss) lifecycle driven by order postbacks.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure business logic with no I/O
//!   - `signal`: signal aggregate, linked accounts, trading window
//!   - `order`: order aggregate, status lifecycle, postback application
//!   - `pricing`: tick rounding and bracket price computation
//!   - `shared`: typed identifiers
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `BrokerGateway`, `TokenProvider`, `OrderLedger`, `SignalStore`
//!   - `use_cases`: `DispatchSignal` (alert → entry orders),
//!     `Reconcile` (postback → bracket placement / sibling cancellation)
//!   - `dto`: payloads crossing the API boundary
//!
//! - **Infrastructure**: Adapters
//!   - `broker`: AngelOne SmartAPI adapter
//!   - `token`: token service client
//!   - `persistence`: SQLite ledger
//!   - `http`: webhook controllers
//!   - `queue`: task queues with retry and per-key mutual exclusion

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// Domain re-exports
pub use domain::order::{Order, OrderStatus, OrderType, OrderVariety, ProductType, TxnType};
pub use domain::signal::{Signal, SignalStatus, TradingWindow};
