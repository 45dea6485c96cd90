// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Queue rules live in domains/queue; these only look things up.
//
// Naming convention: Base* for trait names (e.g., BaseCatalog)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::CatalogItemId;
use crate::domains::catalog::CatalogItem;

// =============================================================================
// Catalog Trait (Infrastructure - item lookup)
// =============================================================================

#[async_trait]
pub trait BaseCatalog: Send + Sync {
    /// Look up a catalog item. `Ok(None)` when it does not exist.
    async fn find(&self, id: CatalogItemId) -> Result<Option<CatalogItem>>;

    /// Cheap liveness check for health reporting.
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
