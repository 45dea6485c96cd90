//! Kernel module - server infrastructure and dependencies.

pub mod catalog;
pub mod deps;
pub mod event_bus;
pub mod rate_limiter;
pub mod scheduled_tasks;
pub mod traits;

pub use catalog::{InMemoryCatalog, PostgresCatalog};
pub use deps::ServerDeps;
pub use event_bus::{EventBus, Subscription};
pub use rate_limiter::RateLimiter;
pub use scheduled_tasks::{run_housekeeping, start_scheduler};
pub use traits::*;
