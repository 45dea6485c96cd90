use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::domains::queue::QUEUE_TOPIC;
use crate::server::app::AxumAppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    entries: usize,
    subscribers: usize,
    catalog: CatalogHealth,
}

#[derive(Serialize)]
pub struct CatalogHealth {
    backend: &'static str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Checks:
/// - Catalog connectivity and responsiveness
/// - Queue size and live WebSocket subscribers
///
/// Returns 200 OK if the catalog answers, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let catalog = &state.server_deps.catalog;

    let catalog_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        catalog.ping(),
    )
    .await
    {
        Ok(Ok(())) => CatalogHealth {
            backend: catalog.backend(),
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => CatalogHealth {
            backend: catalog.backend(),
            status: "error".to_string(),
            error: Some(format!("Ping failed: {}", e)),
        },
        Err(_) => CatalogHealth {
            backend: catalog.backend(),
            status: "error".to_string(),
            error: Some("Ping timeout (>5s)".to_string()),
        },
    };

    let is_healthy = catalog_health.status == "ok";
    let (status_code, overall_status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            entries: state.queue.store().len(),
            subscribers: state.server_deps.event_bus.subscriber_count(QUEUE_TOPIC).await,
            catalog: catalog_health,
        }),
    )
}
