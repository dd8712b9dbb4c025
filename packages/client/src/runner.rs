//! Client execution logic with reconnection support.

use std::time::Duration;

use super::{
    domain::{next_attempt_count, should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::connect_session,
    ui::spawn_input_thread,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Run the WebSocket client with reconnection logic
///
/// Returns `Ok` when the user quits. Errors that retrying cannot fix
/// (duplicate or rejected username) are returned immediately; transient
/// failures are retried up to `MAX_RECONNECT_ATTEMPTS` times in a row. The
/// count starts over whenever a connection gets past the identity frame.
pub async fn run_client(url: String, username: String) -> Result<(), ClientError> {
    let mut input = spawn_input_thread(&username);
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            url,
            username,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        let (established, result) = match connect_session(&url, &username).await {
            Ok(connection) => (true, connection.run(&mut input).await),
            Err(e) => (false, Err(e)),
        };

        match result {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                // If connection ended normally (user exit), don't reconnect
                return Ok(());
            }
            Err(e) => {
                if should_exit_immediately(&e) {
                    tracing::error!("{}. Exiting.", e);
                    return Err(e);
                }

                tracing::warn!("Connection lost: {}", e);
                reconnect_count = next_attempt_count(reconnect_count, established);

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(e);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}
