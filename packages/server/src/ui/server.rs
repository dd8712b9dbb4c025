//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use irori_shared::time::Clock;
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    domain::{MessagePusher, MessageRepository, SessionRegistry},
    usecase::{
        BroadcastSequencer, ConnectSessionUseCase, DisconnectSessionUseCase, GetHistoryUseCase,
        GetSessionsUseCase, IdentifySessionUseCase, SendMessageUseCase,
    },
};

use super::{
    error::ServerError,
    handler::{get_history, get_sessions, health_check, websocket_handler},
    state::AppState,
};

/// WebSocket chat server
///
/// This struct wires the use cases around the injected registry, repository
/// and pusher, and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(config, registry, repository, message_pusher, clock);
/// server.run(shutdown_signal()).await?;
/// ```
pub struct Server {
    config: ServerConfig,
    /// Session Registry（シャットダウン時の残りセッション数の確認に使う）
    registry: Arc<dyn SessionRegistry>,
    /// BroadcastSequencer（ブロードキャストの直列化）
    sequencer: Arc<BroadcastSequencer>,
    connect_session_usecase: Arc<ConnectSessionUseCase>,
    identify_session_usecase: Arc<IdentifySessionUseCase>,
    send_message_usecase: Arc<SendMessageUseCase>,
    get_history_usecase: Arc<GetHistoryUseCase>,
    disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    get_sessions_usecase: Arc<GetSessionsUseCase>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated server configuration
    /// * `registry` - Registry of connected sessions
    /// * `repository` - Message store (schema must already exist)
    /// * `message_pusher` - Delivery to session queues
    /// * `clock` - Time source for receive times
    pub fn new(
        config: ServerConfig,
        registry: Arc<dyn SessionRegistry>,
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sequencer = Arc::new(BroadcastSequencer::new());

        let connect_session_usecase =
            Arc::new(ConnectSessionUseCase::new(registry.clone(), clock.clone()));
        let identify_session_usecase = Arc::new(IdentifySessionUseCase::new(
            registry.clone(),
            repository.clone(),
            message_pusher.clone(),
            sequencer.clone(),
            clock.clone(),
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            repository.clone(),
            registry.clone(),
            message_pusher.clone(),
            sequencer.clone(),
            clock,
        ));
        let get_history_usecase = Arc::new(GetHistoryUseCase::new(repository, message_pusher));
        let disconnect_session_usecase = Arc::new(DisconnectSessionUseCase::new(registry.clone()));
        let get_sessions_usecase = Arc::new(GetSessionsUseCase::new(registry.clone()));

        Self {
            config,
            registry,
            sequencer,
            connect_session_usecase,
            identify_session_usecase,
            send_message_usecase,
            get_history_usecase,
            disconnect_session_usecase,
            get_sessions_usecase,
        }
    }

    /// Bind the listener without accepting connections yet
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        let app_state = Arc::new(AppState {
            connect_session_usecase: self.connect_session_usecase,
            identify_session_usecase: self.identify_session_usecase,
            send_message_usecase: self.send_message_usecase,
            get_history_usecase: self.get_history_usecase,
            disconnect_session_usecase: self.disconnect_session_usecase,
            get_sessions_usecase: self.get_sessions_usecase,
            identity_timeout: self.config.identity_timeout,
            outbound_queue_capacity: self.config.outbound_queue_capacity,
            shutdown: shutdown_rx,
            shutdown_complete: shutdown_complete_tx,
        });

        // Define handlers
        let router = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/sessions", get(get_sessions))
            .route("/api/history", get(get_history))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        Ok(BoundServer {
            listener,
            local_addr,
            router,
            shutdown_tx,
            shutdown_complete_rx,
            registry: self.registry,
            sequencer: self.sequencer,
            shutdown_grace: self.config.shutdown_grace,
        })
    }

    /// Run the WebSocket chat server until `signal` completes
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address or
    /// if there's an error during server execution.
    pub async fn run<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.bind().await?.serve(signal).await
    }
}

/// A server whose listener is bound but not yet serving
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    shutdown_tx: watch::Sender<bool>,
    shutdown_complete_rx: mpsc::Receiver<()>,
    registry: Arc<dyn SessionRegistry>,
    sequencer: Arc<BroadcastSequencer>,
    shutdown_grace: Duration,
}

impl BoundServer {
    /// The address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve connections until `signal` completes, then shut down gracefully
    ///
    /// Shutdown order: stop accepting, notify every session (they close with
    /// 1001), let an in-flight broadcast finish, then wait up to the grace
    /// period for all sessions to end.
    pub async fn serve<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let BoundServer {
            listener,
            local_addr,
            router,
            shutdown_tx,
            mut shutdown_complete_rx,
            registry,
            sequencer,
            shutdown_grace,
        } = self;

        tracing::info!("Irori chat server listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws", local_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        let shutdown_tx = Arc::new(shutdown_tx);
        let notifier = shutdown_tx.clone();
        let open_sessions = registry.clone();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!(
                "Shutting down: closing {} session(s)",
                open_sessions.count()
            );
            notifier.send_replace(true);
        })
        .await
        .map_err(ServerError::Serve)?;

        // 実行中のブロードキャストの完了を待つ
        sequencer.quiesce().await;

        match tokio::time::timeout(shutdown_grace, shutdown_complete_rx.recv()).await {
            Ok(_) => tracing::info!("All sessions closed"),
            Err(_) => tracing::warn!(
                "{} session(s) still open after {:?}",
                registry.count(),
                shutdown_grace
            ),
        }
        drop(shutdown_tx);

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
