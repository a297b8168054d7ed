//! Web server module for the report webhook.
//!
//! This module provides:
//! - The health check and webhook routes mounted at the configured base path
//! - HMAC signature verification for inbound webhooks
//! - `WebhookServer`, which owns the bound socket between `start` and `stop`

pub mod handlers;
pub mod server;
pub mod signature;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, latest_report, report_webhook, AppState, HealthResponse, LatestReportResponse,
    WebhookResponse,
};
pub use server::WebhookServer;
pub use signature::{verify, verify_with_window, RejectReason, VerificationResult};

/// Build the router: `GET`/`POST` on the base path plus `GET {path}/latest`.
pub fn router(state: AppState) -> Router {
    let path = state.config.webhook_path.clone();
    let latest = latest_path(&path);

    Router::new()
        .route(&path, get(health).post(report_webhook))
        .route(&latest, get(latest_report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn latest_path(base: &str) -> String {
    format!("{}/latest", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_path() {
        assert_eq!(latest_path("/stock-analysis"), "/stock-analysis/latest");
        assert_eq!(latest_path("/stock-analysis/"), "/stock-analysis/latest");
        assert_eq!(latest_path("/"), "/latest");
    }
}
