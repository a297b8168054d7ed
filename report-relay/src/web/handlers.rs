//! Webhook endpoint handlers.
//!
//! The webhook handler:
//! 1. Parses the body as a JSON object
//! 2. Verifies the HMAC signature (when enabled)
//! 3. Runs the dispatch pipeline
//! 4. Maps the outcome to 200 / 401 / 500

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::command::{today_report, CommandReply};
use crate::error::{ErrorResponse, RelayError};
use crate::pipeline::ReportPipeline;
use crate::web::signature;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<ReportPipeline>,
}

impl AppState {
    pub fn new(config: Config, pipeline: ReportPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub plugin: String,
    pub timestamp: f64,
}

/// Health check endpoint. Never fails and needs no signature.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();

    Json(HealthResponse {
        status: "ok",
        plugin: state.config.plugin_name.clone(),
        timestamp,
    })
}

// =============================================================================
// Report Webhook
// =============================================================================

/// Webhook success response.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// Report webhook endpoint.
pub async fn report_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(
                error = %e,
                body_length = body.len(),
                "webhook_body_invalid"
            );
            return e.into_response();
        }
    };

    if state.config.log_webhook_body {
        info!(
            body = %String::from_utf8_lossy(&body),
            "webhook_received"
        );
    } else {
        info!(body_length = body.len(), "webhook_received");
    }

    // The only place verification can be bypassed.
    if state.config.enable_signature_verification {
        if let Err(reason) = signature::verify_with_window(
            &payload,
            &headers,
            state.config.secret_key.as_deref(),
            state.config.signature_max_age_secs,
        ) {
            warn!(reason = %reason, "webhook_signature_rejected");
            return RelayError::Authentication(reason).into_response();
        }
    }

    match state.pipeline.process_report(&payload).await {
        Ok(()) => {
            info!("webhook_processed");
            (StatusCode::OK, Json(WebhookResponse { status: "success" })).into_response()
        }
        Err(e) => {
            error!(error = %e, "webhook_process_failed");
            e.into_response()
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, RelayError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RelayError::Validation(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(RelayError::Validation(e.to_string())),
    }
}

// =============================================================================
// Latest Report
// =============================================================================

/// Latest report response.
#[derive(Serialize)]
pub struct LatestReportResponse {
    pub status: &'static str,
    pub report: String,
}

/// HTTP form of the on-demand report command.
pub async fn latest_report(State(state): State<AppState>) -> Response {
    match today_report(state.pipeline.cache()).await {
        CommandReply::Image(artifact) => (
            StatusCode::OK,
            Json(LatestReportResponse {
                status: "ok",
                report: artifact.as_str().to_string(),
            }),
        )
            .into_response(),
        CommandReply::Text(message) => {
            info!("latest_report_unavailable");
            (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
        }
    }
}
