//! Inbound WhatsApp webhook and service endpoints.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::pipeline::Orchestrator;

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Acknowledgement returned before the turn has run.
pub const ACK_STATUS: &str = "Message received and is being processed.";

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Twilio's inbound message form. Only the fields we use.
#[derive(Debug, Deserialize)]
pub struct InboundForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Build the router with the webhook, root banner and health routes.
pub fn webhook_routes(orchestrator: Arc<Orchestrator>) -> Router {
    let state = WebhookState { orchestrator };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/whatsapp/webhook", post(whatsapp_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `whatsapp:+254712345678` → `+254712345678`.
pub fn strip_whatsapp_prefix(from: &str) -> &str {
    let from = from.trim();
    from.strip_prefix(WHATSAPP_PREFIX).unwrap_or(from)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "HealthBridge AI - clinic intake service",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> &'static str {
    "ok"
}

async fn whatsapp_webhook(
    State(state): State<WebhookState>,
    Form(form): Form<InboundForm>,
) -> impl IntoResponse {
    let phone = strip_whatsapp_prefix(&form.from);
    if phone.is_empty() || form.body.trim().is_empty() {
        warn!(from = %form.from, "Rejected webhook with missing From or Body");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Both From and Body are required"})),
        );
    }

    info!(phone, "Webhook received");
    state.orchestrator.submit(form.body, phone.to_string());

    (StatusCode::OK, Json(serde_json::json!({"status": ACK_STATUS})))
}
