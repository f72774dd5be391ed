//! Slack Web API client for republishing messages.
//!
//! Wraps `chat.postMessage` and `auth.test` endpoints with bot token auth.
//! Posting retries on rate limits, server errors, and transport failures with
//! exponential backoff; every other failure is returned immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::RelayError;
use crate::slack::events::MessageEvent;
use crate::traits::MessageForwarder;
use crate::types::{DeliveryReceipt, OutboundMessage};

/// Text sent when the source message carries none.
pub const NO_TEXT_PLACEHOLDER: &str = "(no text)";

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackApiClient {
    client: reqwest::Client,
    bot_token: String,
    api_base_url: String,
    retry: RetryPolicy,
}

/// Bounded exponential backoff for `chat.postMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following zero-based `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(attempt))
    }
}

/// 429 and every 5xx are worth another try; other statuses are final.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Response from Slack's `auth.test` API.
#[derive(Debug, Deserialize)]
pub struct AuthTestResponse {
    pub ok: bool,
    pub team: Option<String>,
    pub team_id: Option<String>,
    pub user: Option<String>,
    pub user_id: Option<String>,
    pub bot_id: Option<String>,
    pub error: Option<String>,
}

/// Response from Slack's `chat.postMessage` API.
#[derive(Debug, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    pub ts: Option<String>,
    pub channel: Option<String>,
    pub error: Option<String>,
}

impl SlackApiClient {
    pub fn new(bot_token: &str, api_base_url: &str) -> Result<Self, RelayError> {
        if bot_token.is_empty() {
            return Err(RelayError::Config(
                "bot token cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| RelayError::Internal(format!("HTTP client init: {}", e)))?;

        Ok(Self {
            client,
            bot_token: bot_token.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_base_url, method)
    }

    /// Verify the bot token and get workspace info via `auth.test`.
    pub async fn auth_test(&self) -> Result<AuthTestResponse, RelayError> {
        let resp = self
            .client
            .post(self.endpoint("auth.test"))
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .map_err(|e| RelayError::Internal(format!("auth.test failed: {}", e)))?;

        let auth: AuthTestResponse = resp
            .json()
            .await
            .map_err(|e| RelayError::ParseError(format!("auth.test parse: {}", e)))?;

        if !auth.ok {
            return Err(RelayError::Config(format!(
                "auth.test rejected: {}",
                auth.error.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(auth)
    }

    /// Send a message via `chat.postMessage`, retrying transient failures.
    pub async fn post_message(
        &self,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, RelayError> {
        let url = self.endpoint("chat.postMessage");
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            let sent = self
                .client
                .post(&url)
                .bearer_auth(&self.bot_token)
                .json(message)
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_success() => {
                    let post_resp: PostMessageResponse = resp.json().await.map_err(|e| {
                        RelayError::ParseError(format!("chat.postMessage parse: {}", e))
                    })?;
                    if !post_resp.ok {
                        return Err(RelayError::PlatformError(
                            post_resp.error.unwrap_or_else(|| "unknown".to_string()),
                        ));
                    }
                    return Ok(DeliveryReceipt {
                        channel_id: post_resp
                            .channel
                            .unwrap_or_else(|| message.channel.clone()),
                        message_ts: post_resp.ts,
                        attempts: attempt + 1,
                        delivered_at: chrono::Utc::now(),
                    });
                }
                Ok(resp) if is_retryable_status(resp.status()) => {
                    last_error = format!("HTTP {}", resp.status().as_u16());
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(RelayError::DeliveryRejected { status, body });
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            tracing::warn!(
                attempt = attempt + 1,
                max_attempts,
                channel = %message.channel,
                error = %last_error,
                "chat.postMessage attempt failed"
            );

            if attempt + 1 < max_attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }

        Err(RelayError::DeliveryExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

#[async_trait]
impl MessageForwarder for SlackApiClient {
    async fn forward(
        &self,
        event: &MessageEvent,
        destination_channel_id: &str,
    ) -> Result<DeliveryReceipt, RelayError> {
        let message = build_outbound(event, destination_channel_id);
        self.post_message(&message).await
    }
}

/// Copy the forwardable parts of `event` into a post for `channel`.
pub fn build_outbound(event: &MessageEvent, channel: &str) -> OutboundMessage {
    let text = event
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(NO_TEXT_PLACEHOLDER);

    OutboundMessage {
        channel: channel.to_string(),
        text: text.to_string(),
        attachments: event.attachments.clone(),
        blocks: event.blocks.clone(),
    }
}
