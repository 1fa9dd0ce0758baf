use std::fmt;

use crate::autograd::{Tape, Var};
use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// `t = T`, supervised by the payoff.
    Terminal,
    /// Lower half at `S = min_s`, upper half at the upper reference level.
    Boundary,
    /// Unlabeled interior points for the PDE residual.
    Collocation,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchKind::Terminal => "terminal",
            BatchKind::Boundary => "boundary",
            BatchKind::Collocation => "collocation",
        };
        f.write_str(name)
    }
}

/// `N` points `(S, t)` as `N×1` columns, with an optional `N×1` target.
///
/// `tracked` records whether the coordinates are placed on a tape with
/// gradient tracking. Batches that feed a derivative are created tracked;
/// pure regression batches are not.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    pub kind: BatchKind,
    pub s: Matrix,
    pub t: Matrix,
    pub target: Option<Matrix>,
    pub tracked: bool,
}

impl SampleBatch {
    pub fn len(&self) -> usize {
        self.s.rows
    }

    pub fn is_empty(&self) -> bool {
        self.s.rows == 0
    }

    /// Places `S` and `t` on the tape, tracked according to the batch.
    pub fn leaves<'t>(&self, tape: &'t Tape) -> (Var<'t>, Var<'t>) {
        (
            tape.leaf(self.s.clone(), self.tracked),
            tape.leaf(self.t.clone(), self.tracked),
        )
    }

    /// The target as an untracked tape constant.
    pub fn target_leaf<'t>(&self, tape: &'t Tape) -> Option<Var<'t>> {
        self.target.as_ref().map(|target| tape.constant(target.clone()))
    }

    /// Same points with gradient tracking switched on or off.
    pub fn tracking(mut self, tracked: bool) -> SampleBatch {
        self.tracked = tracked;
        self
    }

    /// Splits at the midpoint into the lower and upper boundary halves.
    pub fn split_half(&self) -> (SampleBatch, SampleBatch) {
        let mid = self.len() / 2;
        let half = |start: usize, end: usize| SampleBatch {
            kind: self.kind,
            s: self.s.slice_rows(start, end),
            t: self.t.slice_rows(start, end),
            target: self.target.as_ref().map(|target| target.slice_rows(start, end)),
            tracked: self.tracked,
        };
        (half(0, mid), half(mid, self.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> SampleBatch {
        SampleBatch {
            kind: BatchKind::Boundary,
            s: Matrix::column(&[1.0, 1.0, 9.0, 9.0]),
            t: Matrix::column(&[0.1, 0.2, 0.3, 0.4]),
            target: Some(Matrix::column(&[0.0, 0.0, 1.0, 1.0])),
            tracked: false,
        }
    }

    #[test]
    fn test_split_half_preserves_order() {
        let (lower, upper) = batch().split_half();
        assert_eq!(lower.s.data, vec![1.0, 1.0]);
        assert_eq!(upper.t.data, vec![0.3, 0.4]);
        assert_eq!(upper.target.unwrap().data, vec![1.0, 1.0]);
        assert_eq!(lower.len(), 2);
    }

    #[test]
    fn test_leaves_follow_tracking_flag() {
        let tape = Tape::new();
        let (s, t) = batch().leaves(&tape);
        assert!(!s.is_tracked() && !t.is_tracked());

        let (s, t) = batch().tracking(true).leaves(&tape);
        assert!(s.is_tracked() && t.is_tracked());
        assert!(!batch().target_leaf(&tape).unwrap().is_tracked());
    }
}
