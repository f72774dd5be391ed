//! `slack-relay route` — dry-run the rule list against a piece of text.

use std::path::Path;

use clap::ArgMatches;
use slack_relay_core::RuleSet;

pub fn run(matches: &ArgMatches) {
    let rules_path = matches
        .get_one::<String>("rules")
        .expect("rules argument is required");
    let text = matches
        .get_one::<String>("text")
        .expect("text argument is required");

    let rules = match RuleSet::load(Path::new(rules_path)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let matched = rules
        .first_match(text)
        .map(|rule| (rule.pattern(), rule.destination()));

    if matches.get_flag("json") {
        let out = match matched {
            Some((pattern, destination)) => serde_json::json!({
                "matched": true,
                "pattern": pattern,
                "destination": destination,
            }),
            None => serde_json::json!({ "matched": false }),
        };
        println!("{}", out);
        return;
    }

    match matched {
        Some((pattern, destination)) => println!("{} (pattern: {})", destination, pattern),
        None => println!("no match ({} rules checked)", rules.len()),
    }
}
