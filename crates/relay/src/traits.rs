use async_trait::async_trait;

use crate::error::RelayError;
use crate::slack::events::MessageEvent;
use crate::types::DeliveryReceipt;

/// Republishes a source message into a destination channel.
///
/// The Slack Web API client is the production implementation; tests substitute
/// recording doubles.
#[async_trait]
pub trait MessageForwarder: Send + Sync {
    async fn forward(
        &self,
        event: &MessageEvent,
        destination_channel_id: &str,
    ) -> Result<DeliveryReceipt, RelayError>;
}

/// Maps a rule's destination reference to a concrete channel id.
pub trait DestinationResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct EchoForwarder;

    #[async_trait]
    impl MessageForwarder for EchoForwarder {
        async fn forward(
            &self,
            _event: &MessageEvent,
            destination_channel_id: &str,
        ) -> Result<DeliveryReceipt, RelayError> {
            Ok(DeliveryReceipt {
                channel_id: destination_channel_id.to_string(),
                message_ts: Some("1234567890.123456".to_string()),
                attempts: 1,
                delivered_at: chrono::Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn forwarder_object_safe() {
        let forwarder: Box<dyn MessageForwarder> = Box::new(EchoForwarder);
        let receipt = forwarder
            .forward(&MessageEvent::default(), "C9")
            .await
            .unwrap();
        assert_eq!(receipt.channel_id, "C9");
        assert_eq!(receipt.attempts, 1);
    }

    #[test]
    fn hashmap_resolver() {
        let mut map = HashMap::new();
        map.insert("DEPLOY_CH".to_string(), "C9".to_string());
        let resolver: &dyn DestinationResolver = &map;
        assert_eq!(resolver.resolve("DEPLOY_CH").as_deref(), Some("C9"));
        assert!(resolver.resolve("MISSING").is_none());
    }
}
