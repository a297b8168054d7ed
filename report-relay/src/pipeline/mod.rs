//! Report dispatch pipeline.
//!
//! ## Processing Flow
//!
//! ```text
//! webhook body → content → Renderer → ReportCache → Broadcaster → groups
//! ```
//!
//! Steps run strictly in that order for a single webhook. A missing, empty or
//! non-string `content` field ends the pipeline quietly; renderer and delivery
//! failures propagate so the handler can answer with a 500.

pub mod broadcast;
pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::RelayError;
use crate::upstream::{Messenger, RenderOptions, Renderer};

pub use broadcast::{Broadcaster, DeliveryOutcome, DeliveryStatus};
pub use cache::ReportCache;

/// Body field carrying the report markup.
pub const CONTENT_FIELD: &str = "content";

/// Render → cache → broadcast for incoming reports.
pub struct ReportPipeline {
    renderer: Arc<dyn Renderer>,
    broadcaster: Broadcaster,
    targets: Vec<String>,
    cache: ReportCache,
}

impl ReportPipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        broadcaster: Broadcaster,
        targets: Vec<String>,
        cache: ReportCache,
    ) -> Self {
        Self {
            renderer,
            broadcaster,
            targets,
            cache,
        }
    }

    /// Build a pipeline using the target list and broadcast settings from `config`.
    pub fn from_config(
        config: &Config,
        renderer: Arc<dyn Renderer>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let broadcaster = Broadcaster::new(
            messenger,
            Duration::from_millis(config.broadcast_delay_ms),
            config.broadcast_continue_on_error,
        );
        Self::new(
            renderer,
            broadcaster,
            config.target_groups.clone(),
            ReportCache::new(),
        )
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Process one webhook body.
    pub async fn process_report(&self, body: &Map<String, Value>) -> Result<(), RelayError> {
        let content = match body.get(CONTENT_FIELD) {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                warn!(content_type = json_type(other), "report_content_not_text");
                return Ok(());
            }
        };

        if content.is_empty() {
            warn!("report_content_missing");
            return Ok(());
        }

        info!(content_length = content.len(), "report_render_starting");

        let artifact = self
            .renderer
            .render(content, &RenderOptions::report())
            .await
            .map_err(|e| {
                error!(error = %e, "report_render_failed");
                e
            })?;

        self.cache.store(artifact.clone()).await;
        info!(artifact = %artifact, "report_cached");

        let outcomes = self
            .broadcaster
            .broadcast(&artifact, &self.targets)
            .await
            .map_err(|e| {
                error!(artifact = %artifact, error = %e, "report_broadcast_failed");
                e
            })?;

        info!(
            artifact = %artifact,
            recipients = outcomes.len(),
            "report_dispatched"
        );

        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
