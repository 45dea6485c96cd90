pub mod models;

pub use models::CatalogItem;
