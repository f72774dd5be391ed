use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a `chat.postMessage` call that republishes a source message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<serde_json::Value>,
}

/// Receipt for a message the platform accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub channel_id: String,
    pub message_ts: Option<String>,
    pub attempts: u32,
    pub delivered_at: DateTime<Utc>,
}

/// What the relay did with one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayOutcome {
    Forwarded,
    DeliveryFailed,
    NoMatch,
    OutOfScope,
}

impl std::fmt::Display for RelayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayOutcome::Forwarded => write!(f, "forwarded"),
            RelayOutcome::DeliveryFailed => write!(f, "delivery_failed"),
            RelayOutcome::NoMatch => write!(f, "no_match"),
            RelayOutcome::OutOfScope => write!(f, "out_of_scope"),
        }
    }
}

/// A structured decision record, one per routed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLog {
    pub ts: DateTime<Utc>,
    pub request_id: String,
    pub source_channel: Option<String>,
    pub destination: Option<String>,
    pub destination_channel: Option<String>,
    pub outcome: RelayOutcome,
    pub attempts: Option<u32>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
}
