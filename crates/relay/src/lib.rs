//! Stateless Slack message relay.
//!
//! Receives Events API callbacks, verifies their signatures, and republishes
//! messages from one source channel into destination channels chosen by an
//! ordered list of pattern rules.
//!
//! - `slack::signature` — HMAC-SHA256 request verification with replay window
//! - `slack::events` — envelope parsing, scope checks, text extraction
//! - `rules` — first-match-wins routing rules loaded from TOML
//! - `slack::api` — `chat.postMessage` client with bounded retry
//! - `slack::SlackRelay` — the Axum webhook receiver tying it together

pub mod config;
pub mod error;
pub mod logging;
pub mod rules;
pub mod traits;
pub mod types;

pub mod slack;

pub use config::{EnvDestinations, RelayConfig};
pub use error::RelayError;
pub use logging::DecisionLogger;
pub use rules::{Rule, RuleSet};
pub use slack::api::{RetryPolicy, SlackApiClient};
pub use slack::events::{MessageEvent, SlackEnvelope};
pub use slack::SlackRelay;
pub use traits::{DestinationResolver, MessageForwarder};
pub use types::{DecisionLog, DeliveryReceipt, OutboundMessage, RelayOutcome};
