//! AngelOne SmartAPI broker adapter.
//!
//! Implements [`crate::application::ports::BrokerGateway`] against the
//! AngelOne REST API. Sessions are per broker account and supplied by the
//! token provider on every call.

pub mod adapter;
pub mod api_types;
pub mod config;
pub mod error;
pub mod http_client;

pub use adapter::AngelOneBrokerAdapter;
pub use config::AngelOneConfig;
pub use error::AngelOneError;
