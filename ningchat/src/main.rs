//! `ningchat` CLI — connect to a Ning network and print chat traffic.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin ningchat -- --host mynetwork.ning.com \
//!     --email you@example.com --password secret
//!
//! # Or via environment variables
//! NING_HOST=mynetwork.ning.com NING_EMAIL=you@example.com \
//!     NING_PASSWORD=secret cargo run --bin ningchat
//! ```

use clap::Parser;

use ningchat::account::{AccountEvent, NingClient};
use ningchat::config::{CliArgs, ClientConfig};
use ningchat::http::web::WebTransport;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let transport = match WebTransport::new() {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize HTTP transport");
            std::process::exit(1);
        }
    };

    let (client, mut events) = NingClient::new(config, transport);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                AccountEvent::Progress { stage, step, total } => {
                    tracing::info!(step, total, "{}", stage.label());
                }
                AccountEvent::Connected => println!("* connected"),
                AccountEvent::ConnectionError(message) => eprintln!("! {message}"),
                AccountEvent::RoomJoined { room_id } => println!("* joined {room_id}"),
                AccountEvent::RoomLeft { room_id } => println!("* left {room_id}"),
                AccountEvent::MessageReceived {
                    room_id,
                    sender_id,
                    body,
                    whisper,
                    ..
                } => {
                    let marker = if whisper { "(whisper) " } else { "" };
                    println!("[{room_id}] {marker}{sender_id}: {body}");
                }
                AccountEvent::RosterUserUpdated { room_id, name, .. } => {
                    println!("[{room_id}] * {name} is here");
                }
                AccountEvent::RosterUserRemoved { room_id, ning_id } => {
                    println!("[{room_id}] * {ning_id} left");
                }
                AccountEvent::ContactSynthesized { contact } => {
                    tracing::debug!(ning_id = %contact.ning_id, "synthesized placeholder contact");
                }
            }
        }
    });

    if let Err(e) = client.connect().await {
        tracing::error!(error = %e, "connection failed");
        std::process::exit(1);
    }

    // Run until interrupted, then tear the session down cleanly.
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    client.disconnect().await;
    printer.abort();
}
