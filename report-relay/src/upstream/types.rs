//! Types exchanged with the renderer and the messaging platform.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a rendered report image, usually a URL.
///
/// The relay never interprets it beyond handing it to the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device scale tier understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleLevel {
    Normal,
    High,
    Ultra,
}

/// Options sent to the renderer alongside the markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// JPEG quality (0 - 100)
    pub quality: u8,
    /// Device scale tier
    pub device_scale_factor_level: ScaleLevel,
    /// Browser viewport width in pixels
    pub viewport_width: u32,
}

impl RenderOptions {
    /// Fixed options used for stock reports.
    pub fn report() -> Self {
        Self {
            quality: 95,
            device_scale_factor_level: ScaleLevel::Ultra,
            viewport_width: 800,
        }
    }
}

/// One element of an outbound chat message.
///
/// Serializes in the OneBot segment shape: `{"type": "image", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum MessageSegment {
    Image { file: String },
}

/// Structured message handed to the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboundMessage(pub Vec<MessageSegment>);

impl OutboundMessage {
    /// A message consisting of a single image.
    pub fn image(artifact: &ArtifactRef) -> Self {
        Self(vec![MessageSegment::Image {
            file: artifact.as_str().to_string(),
        }])
    }

    pub fn segments(&self) -> &[MessageSegment] {
        &self.0
    }
}
