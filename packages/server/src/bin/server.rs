//! Irori chat server.
//!
//! Clients connect over WebSocket, send `{"username": "..."}`, receive the chat
//! history and then exchange messages with every other connected client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin irori-server
//! cargo run --bin irori-server -- --host 0.0.0.0 --port 3000 --max-clients 50
//! IRORI_DATABASE_URL=sqlite://chat.db cargo run --bin irori-server
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use irori_server::{
    config::{
        DEFAULT_DATABASE_URL, DEFAULT_IDENTITY_TIMEOUT_SECS, DEFAULT_MAX_CLIENTS,
        DEFAULT_OUTBOUND_QUEUE_CAPACITY, DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE_SECS, ServerConfig,
    },
    domain::MessageRepository,
    infrastructure::{
        message_pusher::ChannelMessagePusher, registry::InMemorySessionRegistry,
        repository::SqliteMessageRepository,
    },
    ui::{Server, shutdown_signal},
};
use irori_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "irori-server")]
#[command(about = "WebSocket chat server with persisted history", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "IRORI_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "IRORI_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum number of concurrent sessions
    #[arg(short = 'm', long, env = "IRORI_MAX_CLIENTS", default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Seconds to wait for the username frame after connecting
    #[arg(long, env = "IRORI_IDENTITY_TIMEOUT_SECS", default_value_t = DEFAULT_IDENTITY_TIMEOUT_SECS)]
    identity_timeout_secs: u64,

    /// Frames queued per session before a slow client is disconnected
    #[arg(long, env = "IRORI_OUTBOUND_QUEUE", default_value_t = DEFAULT_OUTBOUND_QUEUE_CAPACITY)]
    outbound_queue: usize,

    /// Message store (`sqlite://<path>`, a file path, or `:memory:`)
    #[arg(short = 'd', long, env = "IRORI_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Seconds to wait for sessions to close on shutdown
    #[arg(long, env = "IRORI_SHUTDOWN_GRACE_SECS", default_value_t = DEFAULT_SHUTDOWN_GRACE_SECS)]
    shutdown_grace_secs: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_clients: args.max_clients,
            identity_timeout: Duration::from_secs(args.identity_timeout_secs),
            outbound_queue_capacity: args.outbound_queue,
            database_url: args.database_url,
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(Args::parse());
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Initialize dependencies in order:
    // 1. Repository
    // 2. Registry
    // 3. MessagePusher
    // 4. Server (UseCases are wired inside)

    // 1. Create Repository (SQLite)
    let repository = match SqliteMessageRepository::connect(&config.database_url) {
        Ok(repository) => Arc::new(repository),
        Err(e) => {
            tracing::error!("Failed to open message store: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = repository.ensure_schema().await {
        tracing::error!("Failed to prepare message store: {}", e);
        std::process::exit(1);
    }

    // 2. Create Registry (in-memory, bounded)
    let registry = Arc::new(InMemorySessionRegistry::new(config.max_clients));
    tracing::info!("Accepting up to {} sessions", config.max_clients);

    // 3. Create MessagePusher (per-session queues)
    let message_pusher = Arc::new(ChannelMessagePusher::new(registry.clone()));

    // 4. Create and run the server
    let server = Server::new(
        config,
        registry,
        repository,
        message_pusher,
        Arc::new(SystemClock),
    );
    if let Err(e) = server.run(shutdown_signal()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
