use crate::autograd::{Tape, Var};
use crate::error::{PinnError, Result};
use crate::sampler::batch::SampleBatch;

/// Mean squared error: mean((predicted - expected)²)
pub fn mse<'t>(predicted: Var<'t>, expected: Var<'t>) -> Var<'t> {
    (predicted - expected).square().mean()
}

/// One-sided penalty: mean(max(x, 0)). Zero whenever every element is ≤ 0.
pub fn relu_mean(x: Var<'_>) -> Var<'_> {
    x.relu().mean()
}

/// The batch target as a tape constant.
pub(crate) fn target<'t>(batch: &SampleBatch, tape: &'t Tape) -> Result<Var<'t>> {
    batch
        .target_leaf(tape)
        .ok_or(PinnError::MissingTarget { kind: batch.kind })
}
