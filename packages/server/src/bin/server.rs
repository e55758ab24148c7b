//! Collaboration room server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server
//! cargo run --bin tsudoi-server -- --host 0.0.0.0 --port 3000 --strict
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use tsudoi_server::{
    config::{DEFAULT_HOST, DEFAULT_MAX_MISSED_PINGS, DEFAULT_PORT, ServerConfig},
    infrastructure::{
        feature_store::InMemoryFeatureStore,
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
    },
    ui::{AppState, Server},
};
use tsudoi_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "tsudoi-server")]
#[command(about = "Real-time collaboration room server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between keep-alive checks
    #[arg(long, default_value_t = 30)]
    heartbeat_interval_secs: u64,

    /// Keep-alive intervals a connection may miss before it is closed
    #[arg(long, default_value_t = DEFAULT_MAX_MISSED_PINGS)]
    max_missed_pings: u32,

    /// Seconds a created room may stay empty before it is deleted
    #[arg(long, default_value_t = 300)]
    empty_room_ttl_secs: u64,

    /// Reject unknown message types instead of forwarding them to the room
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        heartbeat_interval: Duration::from_secs(args.heartbeat_interval_secs.max(1)),
        max_missed_pings: args.max_missed_pings,
        empty_room_ttl: Duration::from_secs(args.empty_room_ttl_secs),
        strict: args.strict,
    };

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. MessagePusher / FeatureStore
    // 3. UseCases (AppState)
    // 4. Server
    let rooms = Arc::new(InMemoryRoomRepository::new());
    let connections = Arc::new(InMemoryConnectionRepository::new());
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let feature_store = Arc::new(InMemoryFeatureStore::new());

    let state = Arc::new(AppState::new(
        rooms,
        connections,
        message_pusher,
        feature_store,
        Arc::new(SystemClock),
        config.strict,
    ));

    let server = Server::new(state, config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
