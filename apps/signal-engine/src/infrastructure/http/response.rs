//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

/// Standard webhook acknowledgment.
///
/// Accepted and intentionally-ignored events both acknowledge with
/// `success: true`; callers cannot tell whether an order was actually
/// dispatched. `error` is set only on 4xx rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// True once the event was authenticated and parsed.
    pub success: bool,
    /// Rejection reason, absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    /// Event acknowledged.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Event rejected before it entered the pipeline.
    #[must_use]
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health.
    pub status: String,
    /// Crate version.
    pub version: String,
}
