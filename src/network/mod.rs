pub mod approximator;
pub mod network;

pub use approximator::Approximator;
pub use network::{BoundNetwork, Network, Scaling};
