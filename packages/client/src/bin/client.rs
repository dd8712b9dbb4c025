//! Irori chat client.
//!
//! Connects to the chat server, announces a username, prints the history and
//! live messages, and sends lines typed at the prompt.
//! `/history` reloads the history and `/quit` exits.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//! A username already in use is rejected by the server and ends the client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin irori-client -- --username alice
//! cargo run --bin irori-client -- -n bob -u ws://127.0.0.1:3000/ws
//! ```

use clap::Parser;

use irori_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "irori-client")]
#[command(about = "WebSocket chat client for the Irori chat server", long_about = None)]
struct Args {
    /// Username shown to other users (must be unique among connected users)
    #[arg(short = 'n', long, env = "IRORI_USERNAME")]
    username: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, env = "IRORI_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = irori_client::run_client(args.url, args.username).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
