//! Error taxonomy shared by the webhook handlers and the dispatch pipeline.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::ConfigError;
use crate::web::signature::RejectReason;

/// Message returned to callers whose signature was rejected.
pub const SIGNATURE_FAILED_MESSAGE: &str = "Signature verification failed";

/// The external call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStage {
    Render,
    Delivery,
}

impl fmt::Display for UpstreamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamStage::Render => f.write_str("render"),
            UpstreamStage::Delivery => f.write_str("delivery"),
        }
    }
}

/// Errors produced while handling a webhook.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("signature verification failed: {0}")]
    Authentication(RejectReason),

    #[error("invalid webhook body: {0}")]
    Validation(String),

    #[error("{stage} failed: {message}")]
    Upstream {
        stage: UpstreamStage,
        message: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl RelayError {
    pub fn render(message: impl Into<String>) -> Self {
        RelayError::Upstream {
            stage: UpstreamStage::Render,
            message: message.into(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        RelayError::Upstream {
            stage: UpstreamStage::Delivery,
            message: message.into(),
        }
    }

    /// Authentication failures are the only client error; everything else is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            RelayError::Validation(_)
            | RelayError::Upstream { .. }
            | RelayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let error = match &self {
            RelayError::Authentication(_) => SIGNATURE_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        };
        (self.status_code(), Json(ErrorResponse { error })).into_response()
    }
}
