//! Clients for the services the relay depends on.
//!
//! This module provides:
//! - The `Renderer` seam and an HTTP client for the HTML-to-image service
//! - The `Messenger` seam and a OneBot-style HTTP client for group delivery
//! - The artifact and message types that flow between them
//!
//! ## Flow
//!
//! ```text
//! HTML content → Renderer → ArtifactRef → OutboundMessage → Messenger (one call per group)
//! ```

pub mod messenger;
pub mod renderer;
pub mod types;

pub use messenger::{Messenger, OneBotMessenger};
pub use renderer::{HttpRenderer, Renderer};
pub use types::{ArtifactRef, MessageSegment, OutboundMessage, RenderOptions, ScaleLevel};
