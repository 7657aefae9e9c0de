//! Token provider port.
//!
//! Session tokens expire and are refreshed by an external token service;
//! the pipeline only consumes this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{BrokerAccountId, ClientId};

/// An authenticated broker session for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSession {
    /// Broker-side client code.
    pub client_id: ClientId,
    /// Bearer token for broker API calls.
    pub auth_token: String,
}

/// Errors from the token provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The account's refresh token is spent; the user must log in again.
    #[error("broker account requires a fresh login")]
    LoginRequired,

    /// No such broker account.
    #[error("broker account not found")]
    NotFound,

    /// The token service itself failed.
    #[error("token service error: {0}")]
    Service(String),
}

/// Port for obtaining a valid session for a broker account.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a non-expired session for the account, refreshing if needed.
    async fn session(&self, account: &BrokerAccountId) -> Result<BrokerSession, TokenError>;
}
