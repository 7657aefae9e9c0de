//! HTTP client wrapper for the AngelOne REST API.
//!
//! Adds the SmartAPI header stack to every request and unwraps the standard
//! response envelope. The client itself makes exactly one attempt per call;
//! the task queue owns the retry policy.

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::BrokerSession;

use super::api_types::ApiEnvelope;
use super::config::AngelOneConfig;
use super::error::AngelOneError;

/// HTTP client for the AngelOne API.
#[derive(Debug, Clone)]
pub struct AngelOneHttpClient {
    client: Client,
    config: AngelOneConfig,
}

impl AngelOneHttpClient {
    /// Create a new HTTP client from config.
    ///
    /// # Errors
    ///
    /// Fails if the API key is empty or the TLS backend cannot initialize.
    pub fn new(config: AngelOneConfig) -> Result<Self, AngelOneError> {
        if config.api_key.is_empty() {
            return Err(AngelOneError::Authentication("missing api key".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AngelOneError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// POST a JSON body to a secure endpoint.
    ///
    /// Returns the envelope's `data`, which the API leaves null on some
    /// success responses.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        session: &BrokerSession,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, AngelOneError> {
        let url = format!("{}{path}", self.config.base_url);
        let request = self.with_headers(self.client.post(&url), session).json(body);
        self.send(request).await
    }

    /// GET a secure endpoint.
    pub async fn get<T: DeserializeOwned>(
        &self,
        session: &BrokerSession,
        path: &str,
    ) -> Result<Option<T>, AngelOneError> {
        let url = format!("{}{path}", self.config.base_url);
        let request = self
            .with_headers(self.client.get(&url), session)
            .header("Content-Type", "application/json");
        self.send(request).await
    }

    fn with_headers(&self, request: RequestBuilder, session: &BrokerSession) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", session.auth_token))
            .header("Accept", "application/json")
            .header("X-UserType", "USER")
            .header("X-SourceID", "WEB")
            .header("X-ClientLocalIP", &self.config.client_local_ip)
            .header("X-ClientPublicIP", &self.config.client_public_ip)
            .header("X-MACAddress", &self.config.mac_address)
            .header("X-PrivateKey", &self.config.api_key)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, AngelOneError> {
        let response = request
            .send()
            .await
            .map_err(|e| AngelOneError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AngelOneError::Network(e.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AngelOneError::Authentication(format!("status {status}")));
        }
        if !status.is_success() {
            // Failure bodies usually still carry the envelope with a code.
            if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body) {
                return Err(AngelOneError::from_envelope(
                    envelope.errorcode,
                    envelope.message,
                ));
            }
            return Err(AngelOneError::Http {
                status: status.as_u16(),
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| AngelOneError::JsonParse(e.to_string()))?;
        if !envelope.status {
            return Err(AngelOneError::from_envelope(
                envelope.errorcode,
                envelope.message,
            ));
        }
        Ok(envelope.data)
    }
}
