/// HTTP boundary for the intake pipeline.
///
/// Exposes the platform's webhook verification handshake, the event-delivery
/// endpoint, and a small read-only query API over the ledger. The delivery
/// endpoint always acknowledges receipt once the signature checks out —
/// internal failures are logged, never surfaced, so the upstream platform
/// does not retry-storm us.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::config::WebhookConfig;
use crate::events::{WebhookPayload, extract_events};
use crate::pipeline::{EventOutcome, IntakePipeline};

type HmacSha256 = Hmac<Sha256>;

/// Max webhook payload size: 1 MB.
const WEBHOOK_MAX_BODY: usize = 1_048_576;

/// Default and maximum page size for the query API.
const DEFAULT_QUERY_LIMIT: usize = 50;
const MAX_QUERY_LIMIT: usize = 500;

#[derive(Clone)]
pub struct GatewayState {
    pipeline: Arc<IntakePipeline>,
    app_secret: String,
    verify_token: String,
}

impl GatewayState {
    pub fn new(pipeline: Arc<IntakePipeline>, webhook: &WebhookConfig) -> Self {
        Self {
            pipeline,
            app_secret: webhook.app_secret.clone(),
            verify_token: webhook.verify_token.clone(),
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/webhook", get(verify_handler).post(delivery_handler))
        .route("/api/health", get(health_handler))
        .route("/api/messages", get(recent_messages_handler))
        .route(
            "/api/customers/{phone}/messages",
            get(customer_messages_handler),
        )
        .with_state(state)
}

/// GET /webhook — the platform's subscription handshake: echo the challenge
/// when the verify token matches.
async fn verify_handler(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map_or("", String::as_str);
    let token = params.get("hub.verify_token").map_or("", String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == "subscribe"
        && !state.verify_token.is_empty()
        && bool::from(token.as_bytes().ct_eq(state.verify_token.as_bytes()))
    {
        info!("webhook verification handshake succeeded");
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("webhook verification handshake rejected (mode={})", mode);
        StatusCode::FORBIDDEN.into_response()
    }
}

/// Validate an HMAC-SHA256 signature against a payload.
pub fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Support both raw hex and the platform's "sha256=..." prefix
    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    expected.as_bytes().ct_eq(sig.as_bytes()).into()
}

/// POST /webhook — event delivery.
///
/// Invalid signatures are rejected before anything is parsed or persisted.
/// Past that point the response is always 200: a malformed payload or an
/// internal failure is our problem, not grounds for upstream redelivery.
async fn delivery_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    if body.len() > WEBHOOK_MAX_BODY {
        warn!("webhook payload too large ({} bytes)", body.len());
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }

    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());
    let Some(signature) = signature else {
        warn!("webhook delivery missing signature header");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if state.app_secret.is_empty() {
        error!("webhook app secret not configured, rejecting delivery");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if !validate_webhook_signature(&state.app_secret, signature, &body) {
        warn!("webhook delivery with invalid signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            // Acknowledge anyway — redelivering a malformed payload would
            // just fail again.
            warn!("webhook payload did not parse: {}", e);
            return (StatusCode::OK, axum::Json(json!({"status": "ignored"}))).into_response();
        }
    };

    let events = extract_events(&payload);
    debug!("webhook delivery with {} event(s)", events.len());
    let outcomes = state.pipeline.handle_delivery(events).await;
    for outcome in &outcomes {
        if let EventOutcome::Failed(reason) = outcome {
            error!("event processing failed: {}", reason);
        }
    }

    (
        StatusCode::OK,
        axum::Json(json!({"status": "received", "events": outcomes.len()})),
    )
        .into_response()
}

/// GET /api/health
async fn health_handler() -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}

fn parse_limit(params: &HashMap<String, String>) -> usize {
    params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_QUERY_LIMIT)
        .min(MAX_QUERY_LIMIT)
}

/// GET /api/messages?limit= — point-in-time view of the ledger.
async fn recent_messages_handler(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    match state
        .pipeline
        .ledger()
        .list_recent(parse_limit(&params))
        .await
    {
        Ok(messages) => axum::Json(messages).into_response(),
        Err(e) => {
            error!("message query failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/customers/{phone}/messages?limit=
async fn customer_messages_handler(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let customer = match state.pipeline.directory().get_by_phone(&phone).await {
        Ok(Some(customer)) => customer,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("customer lookup failed: {:#}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match state
        .pipeline
        .ledger()
        .list_by_customer(customer.id, parse_limit(&params))
        .await
    {
        Ok(messages) => axum::Json(messages).into_response(),
        Err(e) => {
            error!("message query failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Start the gateway server. Returns the join handle and the shared state.
pub async fn start(
    host: &str,
    port: u16,
    pipeline: Arc<IntakePipeline>,
    webhook: &WebhookConfig,
) -> Result<(tokio::task::JoinHandle<()>, GatewayState)> {
    if webhook.app_secret.is_empty() {
        warn!("webhook.appSecret is not set; all deliveries will be rejected");
    }
    let state = GatewayState::new(pipeline, webhook);
    let app = build_router(state.clone());
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("gateway listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("gateway server error: {}", e);
        }
    });

    Ok((handle, state))
}
