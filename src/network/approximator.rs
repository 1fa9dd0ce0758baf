use crate::autograd::Var;

/// A function `(S, t) -> C` evaluated on a tape.
///
/// `s` and `t` are `N×1` columns and the result is an `N×1` column. The
/// computation must be built from tape operations so that the differential
/// operator can take first and second derivatives through it.
pub trait Approximator<'t> {
    fn evaluate(&self, s: Var<'t>, t: Var<'t>) -> Var<'t>;
}
