//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container shared by the queue
//! service, the HTTP handlers and the scheduled tasks. External lookups go
//! through trait objects so tests can swap in process-local backends.

use std::sync::Arc;

use crate::kernel::{BaseCatalog, EventBus, RateLimiter};

// =============================================================================
// ServerDeps
// =============================================================================

/// Infrastructure shared across the server
#[derive(Clone)]
pub struct ServerDeps {
    /// Catalog lookup (Postgres, or in-memory samples)
    pub catalog: Arc<dyn BaseCatalog>,
    /// In-process pub/sub for real-time fan-out to WebSocket clients
    pub event_bus: EventBus,
    /// Vote admission control, one instance for the whole server
    pub rate_limiter: Arc<RateLimiter>,
}

impl ServerDeps {
    pub fn new(
        catalog: Arc<dyn BaseCatalog>,
        event_bus: EventBus,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            catalog,
            event_bus,
            rate_limiter,
        }
    }
}
