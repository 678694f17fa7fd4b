//! `RpcServer` — axum HTTP + WebSocket gateway assembly.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use cinder_core::Provider;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::http::http_rpc;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::ws_upgrade;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The execution provider, shared across all connections and requests.
    pub provider: Arc<dyn Provider>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Open WebSocket connection gauge.
    pub connections: Arc<AtomicUsize>,
    /// When the server started.
    pub start_time: Instant,
}

/// Failure to bring the server up.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// The Cinder gateway server.
///
/// The same port serves HTTP POST requests and WebSocket upgrades, matching
/// the node tooling convention of a single RPC endpoint.
pub struct RpcServer {
    config: Arc<ServerConfig>,
    provider: Arc<dyn Provider>,
    shutdown: Arc<ShutdownCoordinator>,
    connections: Arc<AtomicUsize>,
    start_time: Instant,
}

impl RpcServer {
    /// Create a new server over the given provider.
    pub fn new(config: ServerConfig, provider: Arc<dyn Provider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            connections: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes and layers.
    ///
    /// CORS is wide open (`*`), the development-node convention: the layer
    /// answers OPTIONS preflights with 200 and stamps the headers on every
    /// other response.
    pub fn router(&self) -> Router {
        let state = AppState {
            provider: self.provider.clone(),
            config: self.config.clone(),
            connections: self.connections.clone(),
            start_time: self.start_time,
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", axum::routing::post(http_rpc).get(ws_upgrade))
            .route("/ws", get(ws_upgrade))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and start serving in a background task.
    ///
    /// Returns the bound address (useful with `port: 0`) and the serve
    /// task's handle. The task exits after graceful shutdown is triggered.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(err) = serve.await {
                error!(%err, "server exited with error");
            }
            info!("server stopped");
        });

        Ok((addr, handle))
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Currently open WebSocket connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.connections.load(Ordering::Relaxed);
    Json(health::health_check(state.start_time, connections))
}
