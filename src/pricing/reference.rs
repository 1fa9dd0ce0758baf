use rand::Rng;

use crate::error::PricerError;
use crate::pricing::american_fd::AmericanPutFd;
use crate::pricing::black_scholes::{black_scholes_call, black_scholes_put};
use crate::sampler::noise::LabelNoise;
use crate::train::strategy::OptionStyle;
use crate::train::train_config::TrainConfig;

/// Reference prices to compare trained models against.
///
/// European calls use the closed form, American puts the finite-difference
/// pricer. When `noise_variance > 0` every American price is perturbed by a
/// Gaussian draw with mean `bias` and spread `noise_variance`.
#[derive(Debug, Clone)]
pub struct ReferencePricer {
    pub fd: AmericanPutFd,
    noise: Option<LabelNoise>,
}

impl ReferencePricer {
    pub fn new(bias: f64, noise_variance: f64) -> Result<ReferencePricer, PricerError> {
        let noise = if noise_variance > 0.0 {
            let noise = LabelNoise::new(bias, noise_variance)
                .map_err(|e| PricerError::InvalidInput(e.to_string()))?;
            Some(noise)
        } else if noise_variance == 0.0 {
            None
        } else {
            return Err(PricerError::InvalidInput(format!(
                "noise_variance must be non-negative, got {noise_variance}"
            )));
        };
        Ok(ReferencePricer {
            fd: AmericanPutFd::default(),
            noise,
        })
    }

    /// Noise-free pricer.
    pub fn exact() -> ReferencePricer {
        ReferencePricer {
            fd: AmericanPutFd::default(),
            noise: None,
        }
    }

    /// Dividend yield used by the American put pricer.
    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> ReferencePricer {
        self.fd = self.fd.with_dividend_yield(dividend_yield);
        self
    }

    pub fn european_call(&self, s: f64, strike: f64, tau: f64, r: f64, sigma: f64) -> f64 {
        black_scholes_call(s, strike, tau, r, sigma)
    }

    pub fn european_put(&self, s: f64, strike: f64, tau: f64, r: f64, sigma: f64) -> f64 {
        black_scholes_put(s, strike, tau, r, sigma)
    }

    pub fn american_put<R: Rng + ?Sized>(
        &self,
        s: f64,
        strike: f64,
        tau: f64,
        r: f64,
        sigma: f64,
        rng: &mut R,
    ) -> Result<f64, PricerError> {
        let price = self.fd.price(s, strike, tau, r, sigma)?;
        Ok(match &self.noise {
            Some(noise) => price + noise.sample(rng),
            None => price,
        })
    }

    /// Reference value of `style` at `(s, t)` under the market in `config`.
    pub fn price<R: Rng + ?Sized>(
        &self,
        style: OptionStyle,
        s: f64,
        t: f64,
        config: &TrainConfig,
        rng: &mut R,
    ) -> Result<f64, PricerError> {
        let tau = config.t - t;
        match style {
            OptionStyle::European => Ok(self.european_call(s, config.k, tau, config.r, config.sigma)),
            OptionStyle::AmericanPut => self.american_put(s, config.k, tau, config.r, config.sigma, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exact_pricer_is_deterministic() {
        let pricer = ReferencePricer::new(0.3, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let a = pricer.american_put(45.0, 50.0, 1.0, 0.05, 0.2, &mut rng).unwrap();
        let b = ReferencePricer::exact()
            .american_put(45.0, 50.0, 1.0, 0.05, 0.2, &mut rng)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_perturbs_american_prices() {
        let pricer = ReferencePricer::new(0.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let exact = ReferencePricer::exact()
            .american_put(45.0, 50.0, 1.0, 0.05, 0.2, &mut rng)
            .unwrap();
        let noisy = pricer.american_put(45.0, 50.0, 1.0, 0.05, 0.2, &mut rng).unwrap();
        assert_ne!(exact, noisy);
        assert!((exact - noisy).abs() < 3.0);
    }

    #[test]
    fn test_dividend_yield_reaches_american_prices() {
        let mut rng = StdRng::seed_from_u64(4);
        let plain = ReferencePricer::exact()
            .american_put(50.0, 50.0, 1.0, 0.05, 0.2, &mut rng)
            .unwrap();
        let pricer = ReferencePricer::exact().with_dividend_yield(0.03);
        assert_eq!(pricer.fd.dividend_yield, 0.03);
        let paying = pricer.american_put(50.0, 50.0, 1.0, 0.05, 0.2, &mut rng).unwrap();
        assert!(paying > plain, "{paying} <= {plain}");
    }

    #[test]
    fn test_negative_noise_is_rejected() {
        assert!(matches!(
            ReferencePricer::new(0.0, -0.1),
            Err(PricerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_price_dispatches_on_style() {
        let config = TrainConfig::default();
        let pricer = ReferencePricer::exact();
        let mut rng = StdRng::seed_from_u64(3);
        let call = pricer.price(OptionStyle::European, 50.0, 0.0, &config, &mut rng).unwrap();
        assert_eq!(call, black_scholes_call(50.0, 50.0, 1.0, 0.05, 0.2));
        let put = pricer.price(OptionStyle::AmericanPut, 50.0, 0.0, &config, &mut rng).unwrap();
        assert!(put >= black_scholes_put(50.0, 50.0, 1.0, 0.05, 0.2) - 1e-2);
    }
}
