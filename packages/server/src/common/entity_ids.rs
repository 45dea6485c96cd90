//! Typed ID definitions for queue entities.
//!
//! ```rust
//! use queue_core::common::{CatalogItemId, EntryId};
//!
//! let entry_id = EntryId::new();
//! let item_id = CatalogItemId::new();
//! // let wrong: CatalogItemId = entry_id; // compile error
//! # let _ = (entry_id, item_id);
//! ```

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for queue entries.
pub struct QueueEntry;

/// Marker type for catalog items (the playable things an entry points at).
pub struct CatalogRecord;

// ============================================================================
// Type aliases
// ============================================================================

/// Typed ID for queue entries.
pub type EntryId = Id<QueueEntry>;

/// Typed ID for catalog items.
pub type CatalogItemId = Id<CatalogRecord>;
