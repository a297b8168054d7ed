//! Test doubles for the renderer and messenger seams.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use tokio::{sync::Notify, time::Instant};

use crate::error::RelayError;
use crate::upstream::{ArtifactRef, Messenger, OutboundMessage, RenderOptions, Renderer};

/// Renderer that returns a fixed artifact or a fixed failure.
pub struct StubRenderer {
    artifact: Option<ArtifactRef>,
    calls: AtomicUsize,
    last_markup: Mutex<Option<(String, RenderOptions)>>,
}

impl StubRenderer {
    pub fn returning(url: &str) -> Arc<Self> {
        Arc::new(Self {
            artifact: Some(ArtifactRef::new(url)),
            calls: AtomicUsize::new(0),
            last_markup: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            artifact: None,
            calls: AtomicUsize::new(0),
            last_markup: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, RenderOptions)> {
        self.last_markup.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(
        &self,
        markup: &str,
        options: &RenderOptions,
    ) -> Result<ArtifactRef, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_markup.lock().unwrap() = Some((markup.to_string(), options.clone()));
        self.artifact
            .clone()
            .ok_or_else(|| RelayError::render("renderer unavailable"))
    }
}

/// Renderer that parks every call until the test releases it.
pub struct GatedRenderer {
    pub entered: Notify,
    pub release: Notify,
}

impl GatedRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl Renderer for GatedRenderer {
    async fn render(
        &self,
        _markup: &str,
        _options: &RenderOptions,
    ) -> Result<ArtifactRef, RelayError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ArtifactRef::new("http://r/gated.jpeg"))
    }
}

/// One recorded delivery attempt.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub target: String,
    pub message: OutboundMessage,
    pub at: Instant,
}

/// Messenger that records every attempt and fails for chosen targets.
#[derive(Default)]
pub struct RecordingMessenger {
    failing_targets: Vec<String>,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(targets: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing_targets: targets.iter().map(|t| t.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.target).collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, target: &str, message: &OutboundMessage) -> Result<(), RelayError> {
        self.sent.lock().unwrap().push(SentMessage {
            target: target.to_string(),
            message: message.clone(),
            at: Instant::now(),
        });

        if self.failing_targets.iter().any(|t| t == target) {
            return Err(RelayError::delivery(format!("{target} rejected the message")));
        }
        Ok(())
    }
}

pub fn targets(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
