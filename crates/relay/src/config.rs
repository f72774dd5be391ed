use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::rules::RuleSet;
use crate::traits::DestinationResolver;

/// Runtime configuration for one relay deployment.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Bot token (xoxb-...) used for `chat.postMessage`.
    pub bot_token: String,
    /// Signing secret for verifying inbound webhook requests.
    pub signing_secret: String,
    /// Only messages posted in this channel are relayed.
    pub source_channel_id: String,
    /// When set, only messages whose `bot_id` equals this value are relayed.
    #[serde(default)]
    pub allowed_bot_id: Option<String>,
    /// Bind address for the webhook server.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port for the webhook receiver server.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route that receives Events API callbacks.
    #[serde(default = "default_events_path")]
    pub events_path: String,
    /// Slack Web API base URL, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Optional JSON-lines file that receives one record per routing decision.
    #[serde(default)]
    pub decision_log_path: Option<PathBuf>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3100
}

fn default_events_path() -> String {
    "/slack/events".to_string()
}

fn default_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            signing_secret: String::new(),
            source_channel_id: String::new(),
            allowed_bot_id: None,
            bind_address: default_bind_address(),
            port: default_port(),
            events_path: default_events_path(),
            api_base_url: default_api_base_url(),
            decision_log_path: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from process environment.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| RelayError::Config(format!("{} is not set", key)))
        };

        let defaults = Self::default();
        let port = match get("RELAY_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| RelayError::Config(format!("RELAY_PORT is not a port: {}", raw)))?,
            None => defaults.port,
        };

        let config = Self {
            bot_token: require("SLACK_BOT_TOKEN")?,
            signing_secret: require("SLACK_SIGNING_SECRET")?,
            source_channel_id: require("SLACK_SOURCE_CHANNEL_ID")?,
            allowed_bot_id: get("SLACK_ALLOWED_BOT_ID"),
            bind_address: get("RELAY_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
            events_path: get("RELAY_EVENTS_PATH").unwrap_or(defaults.events_path),
            api_base_url: get("SLACK_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            decision_log_path: get("RELAY_DECISION_LOG").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), RelayError> {
        validate_token_format(&self.bot_token)?;
        if self.signing_secret.is_empty() {
            return Err(RelayError::Config(
                "signing secret cannot be empty".to_string(),
            ));
        }
        if self.source_channel_id.is_empty() {
            return Err(RelayError::Config(
                "source channel id cannot be empty".to_string(),
            ));
        }
        if !self.events_path.starts_with('/') {
            return Err(RelayError::Config(format!(
                "events path must start with '/': {}",
                self.events_path
            )));
        }
        Ok(())
    }
}

/// Validate that a token looks like a Slack bot token.
pub fn validate_token_format(token: &str) -> Result<(), RelayError> {
    if !token.starts_with("xoxb-") {
        return Err(RelayError::Config(
            "bot token must start with 'xoxb-'".to_string(),
        ));
    }
    if token.len() < 20 {
        return Err(RelayError::Config(
            "bot token appears too short".to_string(),
        ));
    }
    Ok(())
}

/// Destination references resolved from environment variables.
///
/// Each rule names an environment variable (e.g. `DEPLOY_CHANNEL_ID`); every name
/// used by the rule set is read once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvDestinations {
    channels: HashMap<String, String>,
}

impl EnvDestinations {
    pub fn from_env(rules: &RuleSet) -> Result<Self, RelayError> {
        Self::from_lookup(rules, |key| std::env::var(key).ok())
    }

    /// Resolve every destination in `rules`, failing on the first unresolved one.
    pub fn from_lookup<F>(rules: &RuleSet, lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut channels = HashMap::new();
        for reference in rules.destinations() {
            let channel = lookup(reference)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    RelayError::Config(format!(
                        "destination '{}' has no channel id in the environment",
                        reference
                    ))
                })?;
            channels.insert(reference.to_string(), channel);
        }
        Ok(Self { channels })
    }
}

impl DestinationResolver for EnvDestinations {
    fn resolve(&self, reference: &str) -> Option<String> {
        self.channels.resolve(reference)
    }
}

impl DestinationResolver for HashMap<String, String> {
    fn resolve(&self, reference: &str) -> Option<String> {
        self.get(reference).cloned()
    }
}
