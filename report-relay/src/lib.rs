//! Report Relay - signed webhook receiver for daily stock analysis reports.
//!
//! A report producer posts rendered HTML to the webhook. The relay verifies the
//! HMAC signature, renders the HTML to an image, remembers the latest image and
//! sends it to every configured chat group, one group at a time.
//!
//! ## Architecture
//!
//! ```text
//! Producer → WebhookServer → signature → ReportPipeline → Renderer
//!                                              ↓
//!                                         ReportCache → Broadcaster → Messenger
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod upstream;
pub mod web;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::RelayError;
pub use pipeline::{Broadcaster, ReportCache, ReportPipeline};
pub use upstream::{ArtifactRef, HttpRenderer, Messenger, OneBotMessenger, Renderer};
pub use web::{AppState, WebhookServer};
