//! `slack-relay serve` — load configuration and run the webhook receiver.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ArgMatches;
use slack_relay_core::{EnvDestinations, RelayConfig, RuleSet, SlackApiClient, SlackRelay};

pub async fn run(matches: &ArgMatches) {
    // Initialize tracing for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(rules_path) = matches.get_one::<String>("rules").map(PathBuf::from) else {
        fail("--rules is required");
    };

    let mut config = match RelayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("  Required: SLACK_BOT_TOKEN, SLACK_SIGNING_SECRET, SLACK_SOURCE_CHANNEL_ID");
            std::process::exit(1);
        }
    };
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(host) = matches.get_one::<String>("host") {
        config.bind_address = host.clone();
    }

    let rules = RuleSet::load(&rules_path).unwrap_or_else(|e| fail(e));
    let destinations = EnvDestinations::from_env(&rules).unwrap_or_else(|e| fail(e));
    tracing::info!(
        rules = rules.len(),
        destinations = rules.destinations().len(),
        source_channel = %config.source_channel_id,
        allowed_bot = config.allowed_bot_id.as_deref().unwrap_or("-"),
        "routing rules loaded"
    );

    let client = SlackApiClient::new(&config.bot_token, &config.api_base_url)
        .unwrap_or_else(|e| fail(e));

    if !matches.get_flag("skip-auth-check") {
        match client.auth_test().await {
            Ok(auth) => tracing::info!(
                workspace = auth.team.as_deref().unwrap_or("unknown"),
                bot_user = auth.user.as_deref().unwrap_or("unknown"),
                "Slack bot token verified"
            ),
            Err(e) => fail(e),
        }
    }

    let relay = Arc::new(SlackRelay::new(
        config,
        rules,
        Arc::new(destinations),
        Arc::new(client),
    ));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down");
    };

    if let Err(e) = relay.serve(shutdown).await {
        fail(e);
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    tracing::error!("{}", e);
    eprintln!("Error: {}", e);
    std::process::exit(1);
}
