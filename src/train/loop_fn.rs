use log::{info, warn};
use rand::Rng;

use crate::autograd::{Tape, Var};
use crate::error::Result;
use crate::loss::record::LossRecord;
use crate::math::matrix::Matrix;
use crate::network::network::{BoundNetwork, Network};
use crate::optim::optimizer::Optimizer;
use crate::train::train_config::TrainConfig;

/// Trains `network` for `config.epochs` epochs and returns the loss record
/// of the **last completed epoch** (the default record when `epochs` is 0).
///
/// Every epoch builds a fresh tape, so no gradient survives from the
/// previous step. `objective` evaluates the composite loss with the network
/// bound to that tape; its gradient with respect to every parameter feeds
/// one optimizer step.
///
/// The record is logged on the first epoch and every `log_interval` epochs
/// after it. A non-finite loss is reported and training carries on.
///
/// # Errors
/// Propagates the first error returned by `objective`.
pub fn train_loop<R, F>(
    network: &mut Network,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
    rng: &mut R,
    mut objective: F,
) -> Result<LossRecord>
where
    R: Rng + ?Sized,
    F: for<'t> FnMut(&BoundNetwork<'t>, &'t Tape, &mut R) -> Result<(Var<'t>, LossRecord)>,
{
    let mut last = LossRecord::default();

    for epoch in 1..=config.epochs {
        let tape = Tape::new();
        let model = network.bind(&tape);
        let (loss, mut record) = objective(&model, &tape, &mut *rng)?;
        record.epoch = epoch;

        if !record.is_finite() {
            warn!("non-finite loss at epoch {epoch}: {record}");
        }

        let grads: Vec<Matrix> = tape
            .grad(loss, &model.parameters(), false)?
            .iter()
            .map(Var::value)
            .collect();
        optimizer.step(network.parameters_mut(), &grads);

        if (epoch - 1) % config.log_interval == 0 {
            info!("{record}");
        }
        last = record;
    }

    Ok(last)
}
