use crate::autograd::Var;
use crate::error::Result;
use crate::network::approximator::Approximator;

/// Value and first/second partial derivatives of an approximator on a batch.
///
/// Every field stays on the tape with its graph intact, so the losses built
/// from it can be differentiated with respect to the model parameters.
#[derive(Debug, Clone, Copy)]
pub struct Partials<'t> {
    pub c: Var<'t>,
    pub dc_dt: Var<'t>,
    pub dc_ds: Var<'t>,
    pub d2c_ds2: Var<'t>,
}

/// Evaluates `approximator` at `(s, t)` and differentiates it.
///
/// # Errors
/// `PinnError::UntrackedTensor` when `s` or `t` was created without tracking.
pub fn partials<'t, A>(approximator: &A, s: Var<'t>, t: Var<'t>) -> Result<Partials<'t>>
where
    A: Approximator<'t> + ?Sized,
{
    let tape = s.tape();
    let c = approximator.evaluate(s, t);

    let first = tape.grad(c, &[t, s], true)?;
    let (dc_dt, dc_ds) = (first[0], first[1]);
    let d2c_ds2 = tape.grad(dc_ds, &[s], true)?[0];

    Ok(Partials {
        c,
        dc_dt,
        dc_ds,
        d2c_ds2,
    })
}

/// First derivative with respect to the price only, for Neumann conditions.
pub fn delta<'t, A>(approximator: &A, s: Var<'t>, t: Var<'t>) -> Result<Var<'t>>
where
    A: Approximator<'t> + ?Sized,
{
    let c = approximator.evaluate(s, t);
    Ok(s.tape().grad(c, &[s], true)?[0])
}

impl<'t> Partials<'t> {
    /// `∂C/∂t + ½σ²S²·∂²C/∂S² + rS·∂C/∂S − rC` at the points `s`.
    pub fn residual(&self, s: Var<'t>, r: f64, sigma: f64) -> Var<'t> {
        let diffusion = (s * s * self.d2c_ds2).scale(0.5 * sigma * sigma);
        let drift = (s * self.dc_ds).scale(r);
        self.dc_dt + diffusion + drift - self.c.scale(r)
    }
}

/// Black-Scholes residual of `approximator` on the batch `(s, t)`.
///
/// Zero wherever the approximator solves the PDE. `s` and `t` must be tracked.
pub fn pde_residual<'t, A>(
    approximator: &A,
    s: Var<'t>,
    t: Var<'t>,
    r: f64,
    sigma: f64,
) -> Result<Var<'t>>
where
    A: Approximator<'t> + ?Sized,
{
    Ok(partials(approximator, s, t)?.residual(s, r, sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::Tape;
    use crate::error::PinnError;
    use crate::math::matrix::Matrix;
    use approx::assert_abs_diff_eq;

    /// `C = S² t`.
    struct Quadratic;

    impl<'t> Approximator<'t> for Quadratic {
        fn evaluate(&self, s: Var<'t>, t: Var<'t>) -> Var<'t> {
            s * s * t
        }
    }

    /// `C = S`, which solves the PDE for any rate and volatility.
    struct Forward;

    impl<'t> Approximator<'t> for Forward {
        fn evaluate(&self, s: Var<'t>, _t: Var<'t>) -> Var<'t> {
            s
        }
    }

    #[test]
    fn test_partials_match_closed_form() {
        let tape = Tape::new();
        let s = tape.var(Matrix::column(&[1.0, 2.0, 3.0]));
        let t = tape.var(Matrix::column(&[0.5, 0.25, 1.0]));
        let p = partials(&Quadratic, s, t).unwrap();

        assert_eq!(p.c.value().data, vec![0.5, 1.0, 9.0]);
        assert_eq!(p.dc_dt.value().data, vec![1.0, 4.0, 9.0]);
        assert_eq!(p.dc_ds.value().data, vec![1.0, 1.0, 6.0]);
        assert_eq!(p.d2c_ds2.value().data, vec![1.0, 0.5, 2.0]);
    }

    #[test]
    fn test_residual_of_quadratic() {
        let (r, sigma) = (0.05, 0.2);
        let tape = Tape::new();
        let s = tape.var(Matrix::column(&[1.0, 2.0, 3.0]));
        let t = tape.var(Matrix::column(&[0.5, 0.25, 1.0]));
        let residual = pde_residual(&Quadratic, s, t, r, sigma).unwrap().value();

        for (i, (&s, &t)) in [1.0, 2.0, 3.0].iter().zip(&[0.5, 0.25, 1.0]).enumerate() {
            let expected =
                s * s + 0.5 * sigma * sigma * s * s * 2.0 * t + r * s * 2.0 * s * t - r * s * s * t;
            assert_abs_diff_eq!(residual.data[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_solution_has_zero_residual() {
        let tape = Tape::new();
        let s = tape.var(Matrix::column(&[10.0, 50.0, 90.0]));
        let t = tape.var(Matrix::column(&[0.0, 0.3, 0.9]));
        let residual = pde_residual(&Forward, s, t, 0.07, 0.3).unwrap();
        assert!(residual.value().data.iter().all(|&x| x.abs() < 1e-12));
    }

    #[test]
    fn test_untracked_coordinates_are_rejected() {
        let tape = Tape::new();
        let s = tape.constant(Matrix::column(&[1.0]));
        let t = tape.var(Matrix::column(&[0.5]));
        let err = pde_residual(&Quadratic, s, t, 0.05, 0.2).unwrap_err();
        assert!(matches!(err, PinnError::UntrackedTensor { .. }));
    }

    #[test]
    fn test_residual_stays_differentiable_in_parameters() {
        struct Scaled<'t>(Var<'t>);

        impl<'t> Approximator<'t> for Scaled<'t> {
            fn evaluate(&self, s: Var<'t>, t: Var<'t>) -> Var<'t> {
                s * s * t * self.0.broadcast_scalar(s.rows(), 1)
            }
        }

        // C = a·S²t, so the residual is linear in `a`.
        let tape = Tape::new();
        let a = tape.var(Matrix::filled(1, 1, 2.0));
        let s = tape.var(Matrix::column(&[1.0, 2.0]));
        let t = tape.var(Matrix::column(&[0.5, 1.0]));
        let residual = pde_residual(&Scaled(a), s, t, 0.0, 0.0).unwrap();
        let grad = tape.grad(residual.sum(), &[a], false).unwrap()[0].scalar();
        // residual = a·S², summed over the batch.
        assert_abs_diff_eq!(grad, 5.0, epsilon = 1e-12);
    }
}
