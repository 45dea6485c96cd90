pub mod activation;
pub mod votes;

pub use activation::ActivationManager;
pub use votes::{VoteAggregator, VoteOrderMode};
