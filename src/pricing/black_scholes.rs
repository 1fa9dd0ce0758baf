//! Closed-form Black-Scholes prices for European options.
//!
//! **Call Price**: C = S·N(d₁) - K·e^(-rτ)·N(d₂)
//! **Put Price**: P = C - S + K·e^(-rτ) (put-call parity)
//!
//! Where τ is the time to maturity and
//! - d₁ = (ln(S/K) + (r + σ²/2)τ) / (σ√τ)
//! - d₂ = d₁ - σ√τ

use crate::autograd::Var;
use crate::math::normal::norm_cdf;
use crate::network::approximator::Approximator;
use crate::train::train_config::TrainConfig;

/// European call value with `tau` years to maturity. Falls back to the payoff
/// once `tau` is no longer positive.
pub fn black_scholes_call(s: f64, strike: f64, tau: f64, r: f64, sigma: f64) -> f64 {
    if tau <= 0.0 {
        return (s - strike).max(0.0);
    }
    let vol_sqrt_tau = sigma * tau.sqrt();
    let d1 = ((s / strike).ln() + (r + 0.5 * sigma * sigma) * tau) / vol_sqrt_tau;
    let d2 = d1 - vol_sqrt_tau;
    s * norm_cdf(d1) - strike * (-r * tau).exp() * norm_cdf(d2)
}

/// European put value via put-call parity.
pub fn black_scholes_put(s: f64, strike: f64, tau: f64, r: f64, sigma: f64) -> f64 {
    if tau <= 0.0 {
        return (strike - s).max(0.0);
    }
    black_scholes_call(s, strike, tau, r, sigma) - s + strike * (-r * tau).exp()
}

/// The closed-form call price as a function of `(S, t)`, built from tape
/// operations so it can stand in for a network wherever an [`Approximator`]
/// is expected.
///
/// Defined for `S > 0` and `t < maturity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesCallSurface {
    pub strike: f64,
    pub maturity: f64,
    pub r: f64,
    pub sigma: f64,
}

impl From<&TrainConfig> for BlackScholesCallSurface {
    fn from(config: &TrainConfig) -> Self {
        BlackScholesCallSurface {
            strike: config.k,
            maturity: config.t,
            r: config.r,
            sigma: config.sigma,
        }
    }
}

impl BlackScholesCallSurface {
    pub fn price(&self, s: f64, t: f64) -> f64 {
        black_scholes_call(s, self.strike, self.maturity - t, self.r, self.sigma)
    }
}

impl<'t> Approximator<'t> for BlackScholesCallSurface {
    fn evaluate(&self, s: Var<'t>, t: Var<'t>) -> Var<'t> {
        let tau = self.maturity - t;
        let vol_sqrt_tau = tau.sqrt().scale(self.sigma);
        let drift = tau.scale(self.r + 0.5 * self.sigma * self.sigma);
        let d1 = (s.scale(1.0 / self.strike).ln() + drift) / vol_sqrt_tau;
        let d2 = d1 - vol_sqrt_tau;
        let discount = tau.scale(-self.r).exp().scale(self.strike);
        s * d1.norm_cdf() - discount * d2.norm_cdf()
    }
}
