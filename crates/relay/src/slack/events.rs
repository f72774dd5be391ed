//! Slack Events API payload parsing, scope checks, and text extraction.
//!
//! The envelope is a tagged enum; the inner event is read leniently so that
//! absent or wrong-typed fields degrade to "not in scope" or "no text"
//! instead of failing the request.

use serde::{Deserialize, Deserializer};

use crate::error::RelayError;

/// Top-level Slack Events API envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    /// Slack sends this to verify the webhook URL during app setup.
    UrlVerification { challenge: String },
    /// Normal event delivery.
    EventCallback {
        #[serde(default, deserialize_with = "lenient")]
        event: Option<MessageEvent>,
    },
    /// Any other envelope type (rate-limit notices, app lifecycle events).
    #[serde(other)]
    Other,
}

impl SlackEnvelope {
    /// Parse the raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        serde_json::from_slice(body).map_err(|e| RelayError::ParseError(format!("envelope: {}", e)))
    }
}

/// The inner event of an `event_callback` envelope.
///
/// Only the fields the relay reads are typed. `attachments` and `blocks` are
/// kept as raw JSON so they can be forwarded byte-for-byte equivalent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageEvent {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
    #[serde(default)]
    pub blocks: Option<serde_json::Value>,
}

/// Deserialize `T`, yielding `None` instead of an error when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Whether `event` is a plain message posted in `source_channel`.
pub fn is_in_scope(event: Option<&MessageEvent>, source_channel: &str) -> bool {
    let Some(event) = event else {
        return false;
    };
    event.event_type.as_deref() == Some("message")
        && event.channel.as_deref() == Some(source_channel)
}

/// Sender restriction: with an allowed bot configured, `bot_id` must equal it exactly.
pub fn sender_allowed(event: &MessageEvent, allowed_bot_id: Option<&str>) -> bool {
    match allowed_bot_id {
        Some(allowed) => event.bot_id.as_deref() == Some(allowed),
        None => true,
    }
}

/// Block types whose nested text takes part in rule matching.
const TEXT_BLOCK_TYPES: [&str; 2] = ["header", "section"];

/// Plain-text view of a message: top-level text followed by header/section block text,
/// joined by newlines.
pub fn extract_text(event: &MessageEvent) -> String {
    let mut text = event.text.clone().unwrap_or_default();

    let Some(blocks) = event.blocks.as_ref().and_then(|b| b.as_array()) else {
        return text;
    };

    for block in blocks {
        let kind = block.get("type").and_then(|t| t.as_str());
        if !kind.is_some_and(|k| TEXT_BLOCK_TYPES.contains(&k)) {
            continue;
        }
        let fragment = block
            .get("text")
            .and_then(|t| t.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or("");
        if fragment.is_empty() {
            continue;
        }
        text.push('\n');
        text.push_str(fragment);
    }

    text
}
