//! Token service client.
//!
//! Broker session tokens are minted and refreshed by a separate token
//! service that owns the AngelOne login flow. This client implements the
//! [`TokenProvider`] port against its HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::application::ports::{BrokerSession, TokenError, TokenProvider};
use crate::domain::shared::{BrokerAccountId, ClientId};

/// Configuration for the token service client.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Token service base URL.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl TokenServiceConfig {
    /// Configuration with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    client_id: String,
    auth_token: String,
}

/// HTTP client for the token service.
#[derive(Debug, Clone)]
pub struct TokenServiceClient {
    client: Client,
    base_url: String,
}

impl TokenServiceClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot initialize.
    pub fn new(config: TokenServiceConfig) -> Result<Self, TokenError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TokenError::Service(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }
}

#[async_trait]
impl TokenProvider for TokenServiceClient {
    async fn session(&self, account: &BrokerAccountId) -> Result<BrokerSession, TokenError> {
        let url = format!("{}/accounts/{}/session", self.base_url, account);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TokenError::Service(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(TokenError::NotFound),
            StatusCode::UNAUTHORIZED => Err(TokenError::LoginRequired),
            status if status.is_success() => {
                let body: SessionResponse = response
                    .json()
                    .await
                    .map_err(|e| TokenError::Service(e.to_string()))?;
                Ok(BrokerSession {
                    client_id: ClientId::new(body.client_id),
                    auth_token: body.auth_token,
                })
            }
            status => Err(TokenError::Service(format!("status {status}"))),
        }
    }
}
