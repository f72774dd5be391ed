use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn rules_arg() -> Arg {
    Arg::new("rules")
        .short('r')
        .long("rules")
        .value_name("FILE")
        .env("RELAY_RULES")
        .help("TOML file with the ordered [[rules]] list")
        .required(true)
}

#[tokio::main]
async fn main() {
    let matches = Command::new("slack-relay")
        .version(VERSION)
        .about("Slack relay - republish channel messages by pattern rules")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Start the webhook receiver (reads SLACK_* settings from the environment)")
                .arg(rules_arg())
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .value_parser(clap::value_parser!(u16))
                        .help("Port to bind the server to (overrides RELAY_PORT)"),
                )
                .arg(
                    Arg::new("host")
                        .short('H')
                        .long("host")
                        .value_name("HOST")
                        .help("Host address to bind to (overrides RELAY_BIND_ADDRESS)"),
                )
                .arg(
                    Arg::new("skip-auth-check")
                        .long("skip-auth-check")
                        .action(ArgAction::SetTrue)
                        .help("Do not call auth.test on startup"),
                ),
        )
        .subcommand(
            Command::new("route")
                .about("Show which destination a message text would be routed to")
                .arg(rules_arg())
                .arg(
                    Arg::new("text")
                        .short('t')
                        .long("text")
                        .value_name("TEXT")
                        .help("Message text to classify")
                        .required(true),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the result as JSON"),
                ),
        )
        .subcommand(
            Command::new("sign")
                .about("Print Slack signature headers for a request body (local testing)")
                .arg(
                    Arg::new("secret")
                        .short('s')
                        .long("secret")
                        .value_name("SECRET")
                        .env("SLACK_SIGNING_SECRET")
                        .hide_env_values(true)
                        .help("Signing secret")
                        .required(true),
                )
                .arg(
                    Arg::new("body")
                        .short('b')
                        .long("body")
                        .value_name("BODY")
                        .help("Exact request body to sign")
                        .required(true),
                )
                .arg(
                    Arg::new("timestamp")
                        .long("timestamp")
                        .value_name("UNIX_SECONDS")
                        .help("Request timestamp (defaults to now)"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("serve", sub_matches)) => commands::serve::run(sub_matches).await,
        Some(("route", sub_matches)) => commands::route::run(sub_matches),
        Some(("sign", sub_matches)) => commands::sign::run(sub_matches),
        _ => {
            println!("slack-relay v{}", VERSION);
            println!("Use --help for available commands");
        }
    }
}
