//! Slack relay — receives Events API webhooks and republishes matching messages.
//!
//! Each request runs a linear pipeline: verify signature, parse envelope,
//! answer the URL handshake or classify the event, extract text, pick a
//! destination by rule, and forward via the Web API. Forwarding failures are
//! logged but never change the response Slack receives.

pub mod api;
pub mod events;
pub mod signature;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::logging::DecisionLogger;
use crate::rules::RuleSet;
use crate::traits::{DestinationResolver, MessageForwarder};
use crate::types::RelayOutcome;

use events::{MessageEvent, SlackEnvelope};

/// Everything a request needs, immutable after construction.
pub struct SlackRelay {
    config: RelayConfig,
    rules: RuleSet,
    destinations: Arc<dyn DestinationResolver>,
    forwarder: Arc<dyn MessageForwarder>,
    logger: DecisionLogger,
}

impl SlackRelay {
    pub fn new(
        config: RelayConfig,
        rules: RuleSet,
        destinations: Arc<dyn DestinationResolver>,
        forwarder: Arc<dyn MessageForwarder>,
    ) -> Self {
        let logger = DecisionLogger::new(config.decision_log_path.clone());
        Self {
            config,
            rules,
            destinations,
            forwarder,
            logger,
        }
    }

    /// Build the Axum router for the webhook receiver.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route(&self.config.events_path, post(handle_slack_event))
            .route("/health", get(health_check))
            .with_state(self)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self: Arc<Self>, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Config(format!("bind {} failed: {}", addr, e)))?;

        tracing::info!(
            addr = %addr,
            path = %self.config.events_path,
            rules = self.rules.len(),
            "Slack relay listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RelayError::Internal(format!("server error: {}", e)))
    }

    /// Route one event and forward it if a rule matches.
    ///
    /// Delivery failures are logged and reported as [`RelayOutcome::DeliveryFailed`],
    /// not returned as errors.
    pub async fn relay_event(
        &self,
        event: Option<&MessageEvent>,
        request_id: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let started = Instant::now();
        let source = self.config.source_channel_id.as_str();

        let event = match event {
            Some(e)
                if events::is_in_scope(Some(e), source)
                    && events::sender_allowed(e, self.config.allowed_bot_id.as_deref()) =>
            {
                e
            }
            other => {
                tracing::info!(
                    channel = other.and_then(|e| e.channel.as_deref()).unwrap_or("-"),
                    bot_id = other.and_then(|e| e.bot_id.as_deref()).unwrap_or("-"),
                    "event out of scope, skipping"
                );
                let mut entry = DecisionLogger::entry(request_id, RelayOutcome::OutOfScope);
                entry.source_channel = other.and_then(|e| e.channel.clone());
                self.logger.log(&entry).await;
                return Ok(RelayOutcome::OutOfScope);
            }
        };

        let text = events::extract_text(event);
        let mut entry = DecisionLogger::entry(request_id, RelayOutcome::NoMatch);
        entry.source_channel = event.channel.clone();

        let Some(rule) = self.rules.first_match(&text) else {
            tracing::info!(text_len = text.len(), "no rule matched, skipping");
            self.logger.log(&entry).await;
            return Ok(RelayOutcome::NoMatch);
        };

        let reference = rule.destination();
        let channel = self.destinations.resolve(reference).ok_or_else(|| {
            RelayError::Config(format!("destination '{}' is not resolvable", reference))
        })?;
        entry.destination = Some(reference.to_string());
        entry.destination_channel = Some(channel.clone());

        let result = self.forwarder.forward(event, &channel).await;
        entry.duration_ms = Some(started.elapsed().as_millis() as u64);

        let outcome = match result {
            Ok(receipt) => {
                tracing::info!(
                    destination = reference,
                    channel = %channel,
                    attempts = receipt.attempts,
                    ts = receipt.message_ts.as_deref().unwrap_or("-"),
                    "message forwarded"
                );
                entry.attempts = Some(receipt.attempts);
                RelayOutcome::Forwarded
            }
            Err(e) => {
                match &e {
                    RelayError::DeliveryExhausted { attempts, .. } => {
                        entry.attempts = Some(*attempts);
                        tracing::error!(
                            destination = reference,
                            channel = %channel,
                            error = %e,
                            "delivery failed"
                        );
                    }
                    _ => {
                        tracing::warn!(
                            destination = reference,
                            channel = %channel,
                            error = %e,
                            "delivery rejected"
                        );
                    }
                }
                entry.error = Some(e.to_string());
                RelayOutcome::DeliveryFailed
            }
        };

        entry.outcome = outcome;
        self.logger.log(&entry).await;
        Ok(outcome)
    }
}

/// Axum handler for Slack Events API.
async fn handle_slack_event(
    State(relay): State<Arc<SlackRelay>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("slack_event", request_id = %request_id);
    process_event(&relay, &request_id, &headers, &body)
        .instrument(span)
        .await
}

async fn process_event(
    relay: &SlackRelay,
    request_id: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, RelayError> {
    signature::verify_request(&relay.config.signing_secret, headers, body)?;

    match SlackEnvelope::from_slice(body)? {
        SlackEnvelope::UrlVerification { challenge } => {
            tracing::info!("answering URL verification challenge");
            Ok(([(header::CONTENT_TYPE, "text/plain")], challenge).into_response())
        }
        SlackEnvelope::EventCallback { event } => {
            let outcome = relay.relay_event(event.as_ref(), request_id).await?;
            tracing::debug!(outcome = %outcome, "event handled");
            Ok(StatusCode::OK.into_response())
        }
        SlackEnvelope::Other => {
            tracing::debug!("ignoring unsupported envelope type");
            Ok(StatusCode::OK.into_response())
        }
    }
}

fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
