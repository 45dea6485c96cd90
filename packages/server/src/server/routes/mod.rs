// HTTP routes
pub mod health;
pub mod queue;
pub mod realtime;

pub use health::*;
pub use queue::*;
pub use realtime::*;
