//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::QueueSettings;
use crate::domains::queue::{BusNotifier, QueueService, QueueStore, QUEUE_TOPIC};
use crate::kernel::ServerDeps;
use crate::server::middleware::extract_client_ip;
use crate::server::routes::{
    activate_entry_handler, create_entry_handler, deactivate_all_handler, delete_entry_handler,
    get_entry_handler, health_handler, history_handler, list_entries_handler, move_entry_handler,
    queue_socket_handler, update_entry_handler, vote_entry_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub queue: Arc<QueueService>,
    pub server_deps: ServerDeps,
}

impl AxumAppState {
    /// Wire a fresh queue to the given infrastructure. Every committed change
    /// is published on [`QUEUE_TOPIC`].
    pub fn new(server_deps: ServerDeps, settings: &QueueSettings) -> Self {
        let notifier = BusNotifier::new(server_deps.event_bus.clone(), QUEUE_TOPIC);
        let store = Arc::new(QueueStore::new(Arc::new(notifier)));
        let queue = Arc::new(QueueService::new(
            store,
            server_deps.catalog.clone(),
            server_deps.rate_limiter.clone(),
            settings,
        ));
        Self { queue, server_deps }
    }
}

/// Build the Axum application router
pub fn build_app(state: AxumAppState) -> Router {
    // CORS configuration - allow any origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/queue",
            get(list_entries_handler).post(create_entry_handler),
        )
        .route("/api/queue/history", get(history_handler))
        .route("/api/queue/deactivate", post(deactivate_all_handler))
        .route(
            "/api/queue/:id",
            get(get_entry_handler)
                .patch(update_entry_handler)
                .delete(delete_entry_handler),
        )
        .route("/api/queue/:id/move", post(move_entry_handler))
        .route("/api/queue/:id/vote", post(vote_entry_handler))
        .route("/api/queue/:id/activate", post(activate_entry_handler))
        // Real-time updates
        .route("/ws/queue", get(queue_socket_handler))
        // Health check
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
