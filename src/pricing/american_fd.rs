use log::debug;

use crate::error::PricerError;

/// Crank-Nicolson finite-difference pricer for American puts.
///
/// Steps the Black-Scholes PDE backwards from maturity on a uniform price
/// grid over `[0, s_max_multiplier · K]` and projects onto the exercise
/// payoff after every step.
#[derive(Debug, Clone, PartialEq)]
pub struct AmericanPutFd {
    pub time_steps: usize,
    pub space_steps: usize,
    /// Upper end of the price grid as a multiple of the strike.
    pub s_max_multiplier: f64,
    /// Continuous dividend yield `q`; the drift is `(r - q)·S`.
    pub dividend_yield: f64,
}

impl Default for AmericanPutFd {
    fn default() -> Self {
        AmericanPutFd {
            time_steps: 200,
            space_steps: 200,
            s_max_multiplier: 4.0,
            dividend_yield: 0.0,
        }
    }
}

/// Thomas algorithm for a tridiagonal system; `lower[0]` and
/// `upper[n - 1]` are ignored. `step` only labels the error.
fn solve_tridiagonal(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    rhs: &[f64],
    step: usize,
) -> Result<Vec<f64>, PricerError> {
    let n = diag.len();
    let mut c_star = vec![0.0; n];
    let mut d_star = vec![0.0; n];

    let mut denom = diag[0];
    for i in 0..n {
        if i > 0 {
            denom = diag[i] - lower[i] * c_star[i - 1];
        }
        if denom.abs() <= 1e-14 || !denom.is_finite() {
            return Err(PricerError::SingularSystem { step });
        }
        c_star[i] = if i + 1 < n { upper[i] / denom } else { 0.0 };
        let carried = if i > 0 { lower[i] * d_star[i - 1] } else { 0.0 };
        d_star[i] = (rhs[i] - carried) / denom;
    }

    let mut x = d_star;
    for i in (0..n.saturating_sub(1)).rev() {
        x[i] -= c_star[i] * x[i + 1];
    }
    Ok(x)
}

impl AmericanPutFd {
    pub fn new(time_steps: usize, space_steps: usize) -> Self {
        AmericanPutFd {
            time_steps,
            space_steps,
            ..Self::default()
        }
    }

    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = dividend_yield;
        self
    }

    /// Price of an American put at spot `s` with `tau` years to maturity.
    ///
    /// # Errors
    /// `PricerError::InvalidInput` for a degenerate grid or market, and
    /// `PricerError::SingularSystem` if a time step cannot be solved.
    pub fn price(&self, s: f64, strike: f64, tau: f64, r: f64, sigma: f64) -> Result<f64, PricerError> {
        if self.time_steps == 0 || self.space_steps < 2 {
            return Err(PricerError::InvalidInput(
                "time_steps must be > 0 and space_steps must be >= 2".to_string(),
            ));
        }
        if !(self.s_max_multiplier.is_finite() && self.s_max_multiplier > 1.0) {
            return Err(PricerError::InvalidInput(format!(
                "s_max_multiplier must exceed 1, got {}",
                self.s_max_multiplier
            )));
        }
        if !(strike.is_finite() && strike > 0.0) {
            return Err(PricerError::InvalidInput(format!("strike must be positive, got {strike}")));
        }
        if !(s.is_finite() && s >= 0.0) {
            return Err(PricerError::InvalidInput(format!("spot must be non-negative, got {s}")));
        }
        if !self.dividend_yield.is_finite() {
            return Err(PricerError::InvalidInput(format!(
                "dividend yield must be finite, got {}",
                self.dividend_yield
            )));
        }
        if !(sigma.is_finite() && sigma > 0.0) || !r.is_finite() || !tau.is_finite() {
            return Err(PricerError::InvalidInput(format!(
                "need finite r, τ and positive σ, got r = {r}, τ = {tau}, σ = {sigma}"
            )));
        }

        let payoff = |spot: f64| (strike - spot).max(0.0);
        if tau <= 0.0 {
            return Ok(payoff(s));
        }

        let n_t = self.time_steps;
        let n_s = self.space_steps;
        let s_max = self.s_max_multiplier * strike;
        if s >= s_max {
            return Ok(0.0);
        }
        let dt = tau / n_t as f64;
        let ds = s_max / n_s as f64;
        let half_dt = 0.5 * dt;
        let drift = r - self.dividend_yield;

        let interior = n_s - 1;
        let mut lhs = (vec![0.0; interior], vec![0.0; interior], vec![0.0; interior]);
        let mut rhs_bands = (vec![0.0; interior], vec![0.0; interior], vec![0.0; interior]);
        for k in 0..interior {
            let spot = (k + 1) as f64 * ds;
            let alpha = 0.5 * sigma * sigma * spot * spot / (ds * ds);
            let beta = drift * spot / (2.0 * ds);
            let (a, b, c) = (alpha - beta, -2.0 * alpha - r, alpha + beta);

            lhs.0[k] = -half_dt * a;
            lhs.1[k] = 1.0 - half_dt * b;
            lhs.2[k] = -half_dt * c;
            rhs_bands.0[k] = half_dt * a;
            rhs_bands.1[k] = 1.0 + half_dt * b;
            rhs_bands.2[k] = half_dt * c;
        }

        // Deep in the money the put is exercised immediately; far out it is worthless.
        let (lower_value, upper_value) = (strike, 0.0);
        let mut values: Vec<f64> = (0..=n_s).map(|i| payoff(i as f64 * ds)).collect();

        for step in 0..n_t {
            let mut rhs: Vec<f64> = (0..interior)
                .map(|k| {
                    let i = k + 1;
                    rhs_bands.0[k] * values[i - 1] + rhs_bands.1[k] * values[i] + rhs_bands.2[k] * values[i + 1]
                })
                .collect();
            rhs[0] -= lhs.0[0] * lower_value;
            rhs[interior - 1] -= lhs.2[interior - 1] * upper_value;

            let solved = solve_tridiagonal(&lhs.0, &lhs.1, &lhs.2, &rhs, step)?;

            values[0] = lower_value;
            values[n_s] = upper_value;
            for (k, v) in solved.into_iter().enumerate() {
                let i = k + 1;
                values[i] = v.max(payoff(i as f64 * ds));
            }
        }

        let i = ((s / ds).floor() as usize).min(n_s - 1);
        let weight = (s - i as f64 * ds) / ds;
        let price = (1.0 - weight) * values[i] + weight * values[i + 1];
        debug!(
            "american put fd: S={s}, K={strike}, τ={tau}, q={} -> {price}",
            self.dividend_yield
        );
        Ok(price)
    }
}
