//! `slack-relay sign` — produce the headers Slack would attach to a request body.

use clap::ArgMatches;
use slack_relay_core::slack::signature;

pub fn run(matches: &ArgMatches) {
    let secret = matches
        .get_one::<String>("secret")
        .expect("secret argument is required");
    let body = matches
        .get_one::<String>("body")
        .expect("body argument is required");
    let timestamp = matches
        .get_one::<String>("timestamp")
        .cloned()
        .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());

    match signature::compute_signature(secret, &timestamp, body.as_bytes()) {
        Ok(sig) => {
            println!("{}: {}", signature::TIMESTAMP_HEADER, timestamp);
            println!("{}: {}", signature::SIGNATURE_HEADER, sig);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
