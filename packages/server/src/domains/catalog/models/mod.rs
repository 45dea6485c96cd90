pub mod catalog_item;

pub use catalog_item::{sample_item_id, sample_items, CatalogItem};
