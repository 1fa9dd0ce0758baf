use crate::autograd::{Tape, Var};
use crate::error::Result;
use crate::loss::mse::{mse, target};
use crate::loss::record::LossRecord;
use crate::loss::{LossBatches, Market};
use crate::network::approximator::Approximator;
use crate::pde::{delta, pde_residual};

/// European call objective: `terminal + boundary + pde`.
///
/// The boundary batch is split at its midpoint. The lower half is a
/// Dirichlet condition on the value, the upper half a Neumann condition on
/// `∂C/∂S` evaluated on a re-tracked copy of those points.
pub fn total_loss_euro<'t, A>(
    model: &A,
    tape: &'t Tape,
    batches: LossBatches<'_>,
    market: Market,
) -> Result<(Var<'t>, LossRecord)>
where
    A: Approximator<'t> + ?Sized,
{
    let (s_colloc, t_colloc) = batches.collocation.leaves(tape);
    let residual = pde_residual(model, s_colloc, t_colloc, market.r, market.sigma)?;
    let loss_pde = residual.square().mean();

    let (s_terminal, t_terminal) = batches.terminal.leaves(tape);
    let loss_terminal = mse(
        model.evaluate(s_terminal, t_terminal),
        target(batches.terminal, tape)?,
    );

    let (lower, upper) = batches.boundary.split_half();
    let (s_min, t_min) = lower.leaves(tape);
    let loss_bc_min = mse(model.evaluate(s_min, t_min), target(&lower, tape)?);

    let upper = upper.tracking(true);
    let (s_max, t_max) = upper.leaves(tape);
    let dc_ds = delta(model, s_max, t_max)?;
    let loss_bc_max = mse(dc_ds, target(&upper, tape)?);

    let loss_boundary = loss_bc_min + loss_bc_max;
    let total = loss_terminal + loss_boundary + loss_pde;

    let record = LossRecord {
        epoch: 0,
        total: total.scalar(),
        terminal: loss_terminal.scalar(),
        boundary: loss_boundary.scalar(),
        pde: loss_pde.scalar(),
        payoff: None,
        complementarity: None,
    };
    Ok((total, record))
}
