pub mod activation;
pub mod autograd;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod pde;
pub mod pricing;
pub mod sampler;
pub mod train;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use autograd::{Tape, Var};
pub use error::{ConfigError, PinnError, PricerError, Result};
pub use layers::dense::Layer;
pub use loss::{total_loss_euro, total_loss_us, LossRecord};
pub use math::matrix::Matrix;
pub use network::{Approximator, Network};
pub use pde::pde_residual;
pub use pricing::{AmericanPutFd, BlackScholesCallSurface, ReferencePricer};
pub use train::{AmericanPutPinn, EuropeanPinn, OptionStyle, PinnStrategy, Strategy, TrainConfig};
