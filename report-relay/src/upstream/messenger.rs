//! Message delivery to chat groups.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::types::OutboundMessage;
use crate::error::RelayError;

/// Delivers a structured message to one recipient.
///
/// Implementations make a single attempt; retries are the caller's concern.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, target: &str, message: &OutboundMessage) -> Result<(), RelayError>;
}

/// Client for a OneBot v11 compatible HTTP API.
///
/// Targets are group ids, optionally prefixed with a platform origin such as
/// `aiocqhttp:GroupMessage:123456`; only the last `:`-separated segment is sent.
#[derive(Clone)]
pub struct OneBotMessenger {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Serialize)]
struct SendGroupMsg<'a> {
    group_id: i64,
    message: &'a OutboundMessage,
}

#[derive(Deserialize)]
struct ApiReply {
    status: Option<String>,
    retcode: Option<i64>,
    #[serde(default)]
    wording: Option<String>,
}

impl OneBotMessenger {
    pub fn new(client: Client, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            access_token,
        }
    }
}

/// Extract the numeric group id from a target identifier.
fn group_id(target: &str) -> Option<i64> {
    target.rsplit(':').next()?.trim().parse().ok()
}

#[async_trait]
impl Messenger for OneBotMessenger {
    async fn send(&self, target: &str, message: &OutboundMessage) -> Result<(), RelayError> {
        let group_id = group_id(target)
            .ok_or_else(|| RelayError::delivery(format!("invalid group target {target:?}")))?;

        let endpoint = format!("{}/send_group_msg", self.base_url);

        let mut request = self
            .client
            .post(&endpoint)
            .json(&SendGroupMsg { group_id, message });

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(group_id = group_id, error = %e, "delivery_request_error");
            RelayError::delivery(format!("group {group_id}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                group_id = group_id,
                status_code = status.as_u16(),
                "delivery_request_rejected"
            );
            return Err(RelayError::delivery(format!(
                "group {group_id}: messaging API returned HTTP {}",
                status.as_u16()
            )));
        }

        // A 2xx without a readable JSON body is treated as delivered.
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(group_id = group_id, error = %e, "delivery_reply_unreadable");
                String::new()
            }
        };
        if let Ok(reply) = serde_json::from_str::<ApiReply>(&body) {
            let failed = reply.status.as_deref() == Some("failed")
                || reply.retcode.is_some_and(|code| code != 0);
            if failed {
                let reason = reply.wording.unwrap_or_else(|| "unknown".to_string());
                error!(
                    group_id = group_id,
                    retcode = ?reply.retcode,
                    reason = %reason,
                    "delivery_request_failed"
                );
                return Err(RelayError::delivery(format!("group {group_id}: {reason}")));
            }
        }

        info!(group_id = group_id, "delivery_request_complete");
        Ok(())
    }
}
