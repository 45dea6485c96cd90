//! Catalog lookup backends.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::CatalogItemId;
use crate::domains::catalog::models::sample_items;
use crate::domains::catalog::CatalogItem;
use crate::kernel::BaseCatalog;

// =============================================================================
// Postgres
// =============================================================================

/// Catalog backed by the `catalog_items` table.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseCatalog for PostgresCatalog {
    async fn find(&self, id: CatalogItemId) -> Result<Option<CatalogItem>> {
        CatalogItem::find_by_id(id, &self.pool).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local catalog, used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<CatalogItemId, CatalogItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with [`sample_items`].
    pub fn with_samples() -> Self {
        let catalog = Self::new();
        for item in sample_items() {
            catalog.insert(item);
        }
        catalog
    }

    pub fn insert(&self, item: CatalogItem) {
        self.items
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BaseCatalog for InMemoryCatalog {
    async fn find(&self, id: CatalogItemId) -> Result<Option<CatalogItem>> {
        Ok(self
            .items
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
