//! Membership lifecycle webhook receiver.
//!
//! The platform posts `{"action": "...", "data": {...}}`. Only
//! `membership.went_valid` is acted on; every other action is acknowledged
//! and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

pub const MEMBERSHIP_WENT_VALID: &str = "membership.went_valid";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

#[async_trait]
pub trait MembershipHandler: Send + Sync {
    /// A membership became valid. `data` is the raw membership payload.
    async fn membership_went_valid(&self, data: &Value);
}

/// Default handler: records the new membership in the log.
pub struct LoggingMembershipHandler;

#[async_trait]
impl MembershipHandler for LoggingMembershipHandler {
    async fn membership_went_valid(&self, data: &Value) {
        let membership_id = data.get("id").and_then(Value::as_str).unwrap_or("unknown");
        let user_id = data.get("user_id").and_then(Value::as_str).unwrap_or("unknown");
        info!(membership_id, user_id, "New valid membership");
    }
}

/// Route an event to the handler. Returns whether it was handled.
pub async fn dispatch(handler: &dyn MembershipHandler, event: &WebhookEvent) -> bool {
    match event.action.as_str() {
        MEMBERSHIP_WENT_VALID => {
            handler.membership_went_valid(&event.data).await;
            true
        }
        other => {
            debug!(action = other, "Ignoring webhook action");
            false
        }
    }
}

#[derive(Clone)]
struct WebhookState {
    handler: Arc<dyn MembershipHandler>,
}

/// Build the webhook route.
pub fn webhook_routes(handler: Arc<dyn MembershipHandler>) -> Router {
    Router::new()
        .route("/api/webhook", post(receive))
        .with_state(WebhookState { handler })
}

async fn receive(
    State(state): State<WebhookState>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    let handled = dispatch(state.handler.as_ref(), &event).await;
    (
        StatusCode::OK,
        Json(json!({ "received": true, "handled": handled })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl MembershipHandler for Recorder {
        async fn membership_went_valid(&self, data: &Value) {
            self.seen.lock().unwrap().push(data.clone());
        }
    }

    #[tokio::test]
    async fn went_valid_reaches_handler() {
        let recorder = Recorder::default();
        let event: WebhookEvent = serde_json::from_value(json!({
            "action": "membership.went_valid",
            "data": {"id": "mem_1", "user_id": "user_1"}
        }))
        .unwrap();

        assert!(dispatch(&recorder, &event).await);
        assert_eq!(recorder.seen.lock().unwrap()[0]["id"], "mem_1");
    }

    #[tokio::test]
    async fn other_actions_are_ignored() {
        let recorder = Recorder::default();
        let event: WebhookEvent =
            serde_json::from_value(json!({"action": "payment.succeeded"})).unwrap();

        assert!(!dispatch(&recorder, &event).await);
        assert!(recorder.seen.lock().unwrap().is_empty());
        assert!(event.data.is_null());
    }

    #[tokio::test]
    async fn logging_handler_tolerates_missing_fields() {
        LoggingMembershipHandler
            .membership_went_valid(&json!({}))
            .await;
    }
}
