// Crowdqueue - Queue Core
//
// This crate provides the backend for a shared, collaboratively ordered queue:
// clients add catalog items, reorder and vote on them, pick the one that is
// playing, and watch every change arrive over a WebSocket.
//
// Queue state lives in memory under domains/queue; the catalog it references
// is looked up through kernel::BaseCatalog.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
