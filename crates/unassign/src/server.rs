//! HTTP server for GitHub webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::{ActivityEvent, EventReactor};

type HmacSha256 = Hmac<Sha256>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Activity event reactor.
    pub reactor: Arc<EventReactor>,
}

/// Build the HTTP router for the unassign service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle a GitHub webhook delivery.
async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let delivery_id = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        "Received GitHub webhook"
    );

    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !verify_webhook_signature(&body, signature, secret) {
            warn!(delivery_id = %delivery_id, "webhook signature verification failed");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    if event_type != "issues" && event_type != "issue_comment" {
        debug!(event_type = %event_type, "Ignoring unhandled event type");
        return Ok(Json(json!({
            "status": "ignored",
            "reason": "unhandled_event_type"
        })));
    }

    let event: ActivityEvent = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Failed to parse GitHub webhook payload");
        StatusCode::BAD_REQUEST
    })?;

    if let Err(e) = state.reactor.on_activity(&event).await {
        error!(
            delivery_id = %delivery_id,
            error = %e,
            "Failed to process activity event"
        );
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(json!({"status": "ok"})))
}

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - `sha256=<hex>` value from the `X-Hub-Signature-256` header
/// * `secret` - Webhook signing secret
///
/// # Returns
/// `true` if the signature is valid, `false` otherwise
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_signature) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(hex_signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if state.config.github_token.is_none() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({"status": "ready"})))
}
