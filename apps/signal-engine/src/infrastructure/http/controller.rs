//! HTTP controller (driver adapter).
//!
//! Axum-based webhook surface. Both webhooks acknowledge with 200 once the
//! request is authenticated and parseable; pipeline failures are contained
//! in the queues and never surface as webhook errors. An accepted alert and
//! an intentionally ignored one (non-live signal, outside the trading
//! window) get the same response, so callers cannot probe dispatch state.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::application::ports::{
    BrokerGateway, OrderLedger, SignalLog, SignalStore, TokenProvider,
};
use crate::application::use_cases::{DispatchOutcome, DispatchSignalUseCase, PostbackPipeline};
use crate::domain::shared::SignalId;

use super::request::{OrderPostbackRequest, SignalAlertRequest};
use super::response::{HealthResponse, WebhookResponse};

/// Application state shared across handlers.
pub struct AppState<B, T, L, S, G>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
    G: SignalLog + 'static,
{
    /// Signal dispatch use case.
    pub dispatch: Arc<DispatchSignalUseCase<B, T, L, S, G>>,
    /// Postback reconciliation pipeline.
    pub postbacks: PostbackPipeline<B, T, L, S>,
    /// Application version.
    pub version: String,
}

impl<B, T, L, S, G> Clone for AppState<B, T, L, S, G>
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
    G: SignalLog + 'static,
{
    fn clone(&self) -> Self {
        Self {
            dispatch: Arc::clone(&self.dispatch),
            postbacks: self.postbacks.clone(),
            version: self.version.clone(),
        }
    }
}

/// The signal webhook's key query parameter, which identifies the signal.
#[derive(Debug, Deserialize)]
struct WebhookAuth {
    #[serde(default)]
    key: Option<String>,
}

/// Create the HTTP router with all endpoints.
pub fn create_router<B, T, L, S, G>(state: AppState<B, T, L, S, G>) -> Router
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
    G: SignalLog + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook/signal", post(signal_webhook))
        .route("/webhook/order-postback", post(order_postback))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<B, T, L, S, G>(
    State(state): State<AppState<B, T, L, S, G>>,
) -> impl IntoResponse
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
    G: SignalLog + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Signal alert webhook.
async fn signal_webhook<B, T, L, S, G>(
    State(state): State<AppState<B, T, L, S, G>>,
    Query(auth): Query<WebhookAuth>,
    Json(request): Json<SignalAlertRequest>,
) -> impl IntoResponse
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
    G: SignalLog + 'static,
{
    let Some(key) = auth.key else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse::rejected("missing webhook key")),
        );
    };

    let alert = match request.into_alert(SignalId::new(key)) {
        Ok(alert) => alert,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::rejected(message)),
            );
        }
    };

    match state.dispatch.execute(alert).await {
        // The key did not resolve to a signal we know.
        Ok(DispatchOutcome::UnknownSignal) => (
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse::rejected("invalid webhook key")),
        ),
        // Queued, non-live and out-of-window all acknowledge identically.
        Ok(_) => (StatusCode::OK, Json(WebhookResponse::ok())),
        Err(error) => {
            tracing::error!(error = %error, "signal dispatch lookup failed");
            (StatusCode::OK, Json(WebhookResponse::ok()))
        }
    }
}

/// Broker order postback webhook.
///
/// Always acknowledges with 200 once the body parses as JSON; the broker
/// retries non-200 responses and a malformed event is not going to get
/// better on redelivery.
async fn order_postback<B, T, L, S, G>(
    State(state): State<AppState<B, T, L, S, G>>,
    Json(request): Json<OrderPostbackRequest>,
) -> impl IntoResponse
where
    B: BrokerGateway + 'static,
    T: TokenProvider + 'static,
    L: OrderLedger + 'static,
    S: SignalStore + 'static,
    G: SignalLog + 'static,
{
    match request.into_event() {
        Ok(event) => state.postbacks.submit(event),
        Err(message) => {
            tracing::warn!(reason = %message, "unusable order postback ignored");
        }
    }
    (StatusCode::OK, Json(WebhookResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::{ReconcileUseCase, test_support};
    use crate::domain::order::OrderStatus;
    use crate::domain::signal::{SignalStatus, TradingWindow};
    use crate::infrastructure::queue::{QueueConfig, RetryPolicy, TaskQueue};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use test_support::{MemoryLedger, RecordingLog, RecordingSignals, ScriptedBroker, StaticTokens};
    use tower::ServiceExt;

    type TestState =
        AppState<ScriptedBroker, StaticTokens, MemoryLedger, RecordingSignals, RecordingLog>;

    fn all_day() -> TradingWindow {
        TradingWindow::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        )
    }

    struct Fixture {
        broker: Arc<ScriptedBroker>,
        ledger: Arc<MemoryLedger>,
        state: TestState,
    }

    fn fixture(window: TradingWindow) -> Fixture {
        let broker = Arc::new(ScriptedBroker::default());
        let tokens = Arc::new(StaticTokens::default());
        let ledger = Arc::new(MemoryLedger::default());
        let signals = Arc::new(RecordingSignals::with(vec![test_support::sample_signal(
            "sig-1",
            SignalStatus::Active,
        )]));
        let log = Arc::new(RecordingLog::default());
        let retry = RetryPolicy::fixed(2, Duration::from_millis(1));

        let dispatch = Arc::new(DispatchSignalUseCase::new(
            Arc::clone(&broker),
            Arc::clone(&tokens),
            Arc::clone(&ledger),
            Arc::clone(&signals),
            log,
            TaskQueue::new(
                "dispatch",
                QueueConfig {
                    max_workers: 4,
                    retry,
                },
            ),
            window,
        ));
        let postbacks = PostbackPipeline::new(
            Arc::new(ReconcileUseCase::new(
                Arc::clone(&broker),
                tokens,
                Arc::clone(&ledger),
                signals,
            )),
            retry,
        );

        Fixture {
            broker,
            ledger,
            state: AppState {
                dispatch,
                postbacks,
                version: "1.0.0".to_string(),
            },
        }
    }

    async fn post_json(state: &TestState, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_check_returns_version() {
        let f = fixture(all_day());
        let response = create_router(f.state.clone())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "1.0.0");
    }

    #[tokio::test]
    async fn signal_webhook_rejects_unknown_key() {
        let f = fixture(all_day());
        let (status, body) =
            post_json(&f.state, "/webhook/signal?key=sig-other", r#"{"txnType": "BUY"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        f.state.dispatch.drained().await;
        assert!(f.broker.placed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn signal_webhook_rejects_missing_key() {
        let f = fixture(all_day());
        let (status, _) = post_json(&f.state, "/webhook/signal", r#"{"txnType": "BUY"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signal_webhook_queues_entry() {
        let f = fixture(all_day());
        let (status, body) =
            post_json(&f.state, "/webhook/signal?key=sig-1", r#"{"txnType": "BUY"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        f.state.dispatch.drained().await;
        assert_eq!(f.broker.placed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signal_webhook_rejects_invalid_side() {
        let f = fixture(all_day());
        let (status, body) =
            post_json(&f.state, "/webhook/signal?key=sig-1", r#"{"txnType": "HOLD"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn ignored_alert_is_indistinguishable_from_accepted() {
        // A window only containing midnight exactly.
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let f = fixture(TradingWindow::new(midnight, midnight));
        let (status, body) =
            post_json(&f.state, "/webhook/signal?key=sig-1", r#"{"txnType": "BUY"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        f.state.dispatch.drained().await;
        assert!(f.broker.placed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn postback_webhook_applies_fill() {
        let f = fixture(all_day());
        f.ledger.seed(test_support::entry_order("ord-1"));
        *f.broker.ltp.lock().unwrap() = dec!(100.00);

        let (status, body) = post_json(
            &f.state,
            "/webhook/order-postback",
            r#"{
                "orderid": "ord-1",
                "clientcode": "D12345",
                "orderstatus": "open",
                "filledshares": "4",
                "averageprice": "100.00"
            }"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        f.state.postbacks.drained().await;
        let order = f.ledger.get("ord-1").unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.filled_shares, 4);
    }

    #[tokio::test]
    async fn unusable_postback_still_returns_ok() {
        let f = fixture(all_day());
        let (status, body) = post_json(
            &f.state,
            "/webhook/order-postback",
            r#"{"orderid": "", "clientcode": "D12345"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        f.state.postbacks.drained().await;
        assert!(f.broker.placed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn postback_for_unknown_order_still_returns_ok() {
        let f = fixture(all_day());
        let (status, _) = post_json(
            &f.state,
            "/webhook/order-postback",
            r#"{"orderid": "ord-x", "clientcode": "D12345", "orderstatus": "complete"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        f.state.postbacks.drained().await;
        assert!(f.broker.placed.lock().unwrap().is_empty());
    }
}
