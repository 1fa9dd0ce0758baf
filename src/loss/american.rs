use rand::Rng;

use crate::autograd::{Tape, Var};
use crate::error::Result;
use crate::loss::mse::{mse, relu_mean, target};
use crate::loss::record::LossRecord;
use crate::loss::{LossBatches, Market};
use crate::network::approximator::Approximator;
use crate::pde::{delta, partials};
use crate::sampler::noise::LabelNoise;

/// American put objective:
/// `terminal + boundary + pde + payoff + complementarity`.
///
/// On the collocation points the value must dominate the (noisy) exercise
/// payoff and the PDE operator must be non-positive, with at least one of
/// the two holding with equality:
///
/// - `pde = mean(relu(residual))`
/// - `payoff = mean(relu(payoff − C))`
/// - `complementarity = mean(min(C − payoff, −residual)²)`
///
/// The payoff noise is drawn afresh from `noise` on every call. The boundary
/// batch is split at its midpoint: a Neumann condition on `∂C/∂S` at the
/// lower half (re-tracked), a Dirichlet condition on the value at the upper.
pub fn total_loss_us<'t, A, R>(
    model: &A,
    tape: &'t Tape,
    batches: LossBatches<'_>,
    market: Market,
    noise: &LabelNoise,
    rng: &mut R,
) -> Result<(Var<'t>, LossRecord)>
where
    A: Approximator<'t> + ?Sized,
    R: Rng + ?Sized,
{
    let collocation = batches.collocation;
    let (s_colloc, t_colloc) = collocation.leaves(tape);
    let p = partials(model, s_colloc, t_colloc)?;
    let residual = p.residual(s_colloc, market.r, market.sigma);
    let loss_pde = relu_mean(residual);

    let strike = market.strike;
    let intrinsic = collocation.s.map(|s| (strike - s).max(0.0));
    let payoff = tape.constant(noise.perturb(&intrinsic, rng));
    let loss_payoff = relu_mean(payoff - p.c);
    let loss_comp = (p.c - payoff).minimum(-residual).square().mean();

    let (s_terminal, t_terminal) = batches.terminal.leaves(tape);
    let loss_terminal = mse(
        model.evaluate(s_terminal, t_terminal),
        target(batches.terminal, tape)?,
    );

    let (lower, upper) = batches.boundary.split_half();
    let lower = lower.tracking(true);
    let (s_min, t_min) = lower.leaves(tape);
    let dc_ds = delta(model, s_min, t_min)?;
    let loss_bc_min = mse(dc_ds, target(&lower, tape)?);

    let (s_max, t_max) = upper.leaves(tape);
    let loss_bc_max = mse(model.evaluate(s_max, t_max), target(&upper, tape)?);

    let loss_boundary = loss_bc_min + loss_bc_max;
    let total = loss_terminal + loss_boundary + loss_pde + loss_payoff + loss_comp;

    let record = LossRecord {
        epoch: 0,
        total: total.scalar(),
        terminal: loss_terminal.scalar(),
        boundary: loss_boundary.scalar(),
        pde: loss_pde.scalar(),
        payoff: Some(loss_payoff.scalar()),
        complementarity: Some(loss_comp.scalar()),
    };
    Ok((total, record))
}
