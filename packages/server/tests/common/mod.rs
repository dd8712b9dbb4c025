//! Helpers for end-to-end tests: an in-process server bound to an ephemeral
//! port and a minimal WebSocket client.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use irori_server::{
    config::ServerConfig,
    domain::{MessageRepository, SessionRegistry},
    infrastructure::{
        message_pusher::ChannelMessagePusher, registry::InMemorySessionRegistry,
        repository::SqliteMessageRepository,
    },
    ui::{Server, ServerError},
};
use irori_shared::time::SystemClock;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// How long a test waits for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Helper struct to manage server lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<InMemorySessionRegistry>,
    pub repository: Arc<SqliteMessageRepository>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestServer {
    /// Start a server with the default test configuration
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after adjusting the test configuration
    pub async fn start_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: ":memory:".to_string(),
            shutdown_grace: Duration::from_secs(2),
            ..ServerConfig::default()
        };
        configure(&mut config);

        let repository = Arc::new(SqliteMessageRepository::connect(&config.database_url).unwrap());
        repository.ensure_schema().await.unwrap();
        let registry = Arc::new(InMemorySessionRegistry::new(config.max_clients));
        let message_pusher = Arc::new(ChannelMessagePusher::new(registry.clone()));

        let server = Server::new(
            config,
            registry.clone(),
            repository.clone(),
            message_pusher,
            Arc::new(SystemClock),
        );
        let bound = server.bind().await.unwrap();
        let addr = bound.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(bound.serve(async move {
            let _ = shutdown_rx.await;
        }));

        TestServer {
            addr,
            registry,
            repository,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Get an HTTP URL for this server
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until `count` sessions are registered
    pub async fn wait_for_registered(&self, count: usize) {
        self.wait_until(|registry| registry.count() == count).await;
    }

    /// Wait until `count` sessions have bound a username
    pub async fn wait_for_active(&self, count: usize) {
        self.wait_until(|registry| {
            registry
                .enumerate()
                .iter()
                .filter(|record| record.is_active())
                .count()
                == count
        })
        .await;
    }

    async fn wait_until(&self, condition: impl Fn(&InMemorySessionRegistry) -> bool) {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while !condition(&self.registry) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached (registered: {})",
                self.registry.count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Trigger graceful shutdown and wait for the server to finish
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let handle = self.handle.take().expect("server already stopped");
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Helper struct to drive one WebSocket connection
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Open a WebSocket connection without sending anything
    pub async fn connect(url: &str) -> Self {
        let (ws, _response) = connect_async(url).await.expect("failed to connect");
        TestClient { ws }
    }

    /// Connect and send the identity frame
    pub async fn join(url: &str, username: &str) -> Self {
        let mut client = Self::connect(url).await;
        client
            .send(&serde_json::json!({ "username": username }).to_string())
            .await;
        client
    }

    /// Send a text frame
    pub async fn send(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("failed to send");
    }

    /// Send a chat envelope
    pub async fn say(&mut self, time: &str, message: &str) {
        self.send(&serde_json::json!({ "time": time, "message": message }).to_string())
            .await;
    }

    /// Receive the next text frame, skipping control frames
    pub async fn recv_text(&mut self) -> String {
        let result = tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                    other => panic!("expected a text frame, got {:?}", other),
                }
            }
        })
        .await;
        result.expect("timed out waiting for a text frame")
    }

    /// Receive the next text frame as a JSON value
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = self.recv_text().await;
        serde_json::from_str(&text).expect("frame is not JSON")
    }

    /// Assert that no text frame arrives within `duration`
    pub async fn expect_silence(&mut self, duration: Duration) {
        if let Ok(frame) = tokio::time::timeout(duration, self.ws.next()).await {
            panic!("expected no frame, got {:?}", frame);
        }
    }

    /// Wait for a close frame and return its code
    pub async fn recv_close_code(&mut self) -> u16 {
        let result = tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(Some(frame)))) => return u16::from(frame.code),
                    Some(Ok(Message::Close(None))) => panic!("close frame without a code"),
                    Some(Ok(_)) => continue,
                    other => panic!("expected a close frame, got {:?}", other),
                }
            }
        })
        .await;
        result.expect("timed out waiting for a close frame")
    }

    /// Close the connection from the client side
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
