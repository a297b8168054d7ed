//! Paced fan-out of a rendered report to every configured group.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::error::RelayError;
use crate::upstream::{ArtifactRef, Messenger, OutboundMessage};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

/// Per-recipient record of a broadcast. Only logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

/// Sends one artifact to a list of recipients, one at a time.
///
/// Every successful send is followed by `delay` so the messaging platform does
/// not flag the bot for flooding. Sends are never issued in parallel.
#[derive(Clone)]
pub struct Broadcaster {
    messenger: Arc<dyn Messenger>,
    delay: Duration,
    continue_on_error: bool,
}

impl Broadcaster {
    pub fn new(messenger: Arc<dyn Messenger>, delay: Duration, continue_on_error: bool) -> Self {
        Self {
            messenger,
            delay,
            continue_on_error,
        }
    }

    /// Deliver `artifact` to each target in list order.
    ///
    /// By default the first failure aborts the remaining sends and is returned.
    /// With `continue_on_error` failures are recorded in the outcomes instead.
    pub async fn broadcast(
        &self,
        artifact: &ArtifactRef,
        targets: &[String],
    ) -> Result<Vec<DeliveryOutcome>, RelayError> {
        let message = OutboundMessage::image(artifact);
        let mut outcomes = Vec::with_capacity(targets.len());

        info!(
            artifact = %artifact,
            recipients = targets.len(),
            "broadcast_starting"
        );

        for recipient in targets {
            info!(recipient = %recipient, "broadcast_sending");

            match self.messenger.send(recipient, &message).await {
                Ok(()) => {
                    outcomes.push(DeliveryOutcome {
                        recipient: recipient.clone(),
                        status: DeliveryStatus::Delivered,
                    });
                    sleep(self.delay).await;
                }
                Err(e) => {
                    error!(recipient = %recipient, error = %e, "broadcast_send_failed");

                    if !self.continue_on_error {
                        return Err(e);
                    }

                    outcomes.push(DeliveryOutcome {
                        recipient: recipient.clone(),
                        status: DeliveryStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        let delivered = outcomes.iter().filter(|o| o.is_delivered()).count();
        info!(
            delivered = delivered,
            failed = outcomes.len() - delivered,
            "broadcast_complete"
        );

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{targets, RecordingMessenger};
    use crate::upstream::MessageSegment;

    const DELAY: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_sends_in_order_with_pacing() {
        let messenger = RecordingMessenger::new();
        let broadcaster = Broadcaster::new(messenger.clone(), DELAY, false);
        let artifact = ArtifactRef::new("http://render.local/a.jpeg");

        let outcomes = broadcaster
            .broadcast(&artifact, &targets(&["g1", "g2", "g3"]))
            .await
            .unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(messenger.targets(), vec!["g1", "g2", "g3"]);
        for pair in sent.windows(2) {
            assert!(pair[1].at.duration_since(pair[0].at) >= DELAY);
        }
        assert!(outcomes.iter().all(DeliveryOutcome::is_delivered));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_is_single_image() {
        let messenger = RecordingMessenger::new();
        let broadcaster = Broadcaster::new(messenger.clone(), DELAY, false);
        let artifact = ArtifactRef::new("http://render.local/a.jpeg");

        broadcaster
            .broadcast(&artifact, &targets(&["g1"]))
            .await
            .unwrap();

        let sent = messenger.sent();
        assert_eq!(
            sent[0].message.segments(),
            &[MessageSegment::Image {
                file: "http://render.local/a.jpeg".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_stops_at_first_failure() {
        let messenger = RecordingMessenger::failing_for(&["g2"]);
        let broadcaster = Broadcaster::new(messenger.clone(), DELAY, false);
        let artifact = ArtifactRef::new("http://render.local/a.jpeg");

        let err = broadcaster
            .broadcast(&artifact, &targets(&["g1", "g2", "g3"]))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("g2 rejected"));
        assert_eq!(messenger.targets(), vec!["g1", "g2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_on_error_isolates_failures() {
        let messenger = RecordingMessenger::failing_for(&["g2"]);
        let broadcaster = Broadcaster::new(messenger.clone(), DELAY, true);
        let artifact = ArtifactRef::new("http://render.local/a.jpeg");

        let outcomes = broadcaster
            .broadcast(&artifact, &targets(&["g1", "g2", "g3"]))
            .await
            .unwrap();

        assert_eq!(messenger.targets(), vec!["g1", "g2", "g3"]);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_delivered());
        assert!(matches!(outcomes[1].status, DeliveryStatus::Failed(_)));
        assert!(outcomes[2].is_delivered());
    }

    #[tokio::test]
    async fn test_no_targets_is_noop() {
        let messenger = RecordingMessenger::new();
        let broadcaster = Broadcaster::new(messenger.clone(), DELAY, false);

        let outcomes = broadcaster
            .broadcast(&ArtifactRef::new("http://r/a"), &[])
            .await
            .unwrap();

        assert!(outcomes.is_empty());
        assert!(messenger.sent().is_empty());
    }
}
