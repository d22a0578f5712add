use axum::{
    routing::{get, post},
    Router,
};
use eden_broadcast::{BroadcastDispatcher, ConnectionRegistry};
use eden_core::{AlertTransformer, DeviceCatalog, EdenConfig};
use eden_protocol::routes;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::services::{ServeDir, ServeFile};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: EdenConfig,
    pub transformer: AlertTransformer,
    /// Live viewers. Shared with the dispatcher, which evicts failed ones.
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: BroadcastDispatcher,
    pub catalog: DeviceCatalog,
    /// Flipped to true once on shutdown; every viewer task watches it.
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: EdenConfig, catalog: DeviceCatalog) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.broadcast.max_connections));
        let dispatcher =
            BroadcastDispatcher::new(Arc::clone(&registry), config.broadcast.send_timeout());
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            transformer: AlertTransformer::new(),
            registry,
            dispatcher,
            catalog,
            shutdown,
        }
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Ask every open viewer connection to close.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route(routes::HEALTH, get(crate::http::health::health_handler))
        .route(routes::INGEST, post(crate::http::ingest::ingest_handler))
        .route(routes::DEVICES, get(crate::http::devices::devices_handler))
        .route(routes::SUBSCRIBE, get(crate::ws::connection::ws_handler));

    if let Some(dir) = state.config.dashboard.static_dir.as_deref() {
        let dir = Path::new(dir);
        router = router
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service(routes::STATIC_PREFIX, ServeDir::new(dir));
    }

    router
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
