//! HTML-to-image rendering.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use super::types::{ArtifactRef, RenderOptions};
use crate::error::RelayError;

/// Turns HTML markup into a displayable image.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, markup: &str, options: &RenderOptions)
        -> Result<ArtifactRef, RelayError>;
}

/// Client for a text2img rendering service.
///
/// Posts the markup to `{base}/text2img/generate` and resolves the returned
/// id to `{base}/text2img/data/{id}`.
#[derive(Clone)]
pub struct HttpRenderer {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    tmpl: &'a str,
    tmpldata: Map<String, Value>,
    json: bool,
    options: &'a RenderOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    data: Option<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    id: String,
}

impl HttpRenderer {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn artifact_url(&self, id: &str) -> String {
        format!("{}/text2img/data/{}", self.base_url, id)
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(
        &self,
        markup: &str,
        options: &RenderOptions,
    ) -> Result<ArtifactRef, RelayError> {
        let endpoint = format!("{}/text2img/generate", self.base_url);

        info!(
            endpoint = %endpoint,
            markup_length = markup.len(),
            quality = options.quality,
            viewport_width = options.viewport_width,
            "render_request_starting"
        );

        let request = GenerateRequest {
            tmpl: markup,
            tmpldata: Map::new(),
            json: true,
            options,
        };

        let response = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!(endpoint = %endpoint, error = %e, "render_request_timeout");
                } else {
                    error!(endpoint = %endpoint, error = %e, "render_request_error");
                }
                RelayError::render(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            error!(
                status_code = status.as_u16(),
                body_preview = %preview,
                "render_request_rejected"
            );
            return Err(RelayError::render(format!(
                "render service returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RelayError::render(format!("invalid render response: {e}")))?;

        let id = parsed
            .data
            .map(|d| d.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::render("render service returned no image id"))?;

        let artifact = ArtifactRef::new(self.artifact_url(&id));
        info!(artifact = %artifact, "render_request_complete");

        Ok(artifact)
    }
}
