//! Composite PINN objectives.

pub mod american;
pub mod european;
pub mod mse;
pub mod record;

pub use american::total_loss_us;
pub use european::total_loss_euro;
pub use mse::{mse, relu_mean};
pub use record::LossRecord;

use crate::sampler::batch::SampleBatch;
use crate::train::train_config::TrainConfig;

/// The three sampled regions an objective is evaluated on.
#[derive(Debug, Clone, Copy)]
pub struct LossBatches<'a> {
    pub terminal: &'a SampleBatch,
    pub boundary: &'a SampleBatch,
    pub collocation: &'a SampleBatch,
}

/// Market parameters entering the objectives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Market {
    pub r: f64,
    pub sigma: f64,
    pub strike: f64,
}

impl From<&TrainConfig> for Market {
    fn from(config: &TrainConfig) -> Self {
        Market {
            r: config.r,
            sigma: config.sigma,
            strike: config.k,
        }
    }
}
