use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::ConfigError;
use crate::math::matrix::Matrix;

/// Gaussian perturbation applied to synthetic labels.
#[derive(Debug, Clone, Copy)]
pub struct LabelNoise {
    normal: Normal<f64>,
}

impl LabelNoise {
    /// `bias` is the mean and `noise_variance` the spread handed to the
    /// normal distribution, matching how the configuration names them.
    /// A negative or non-finite spread is rejected.
    pub fn new(bias: f64, noise_variance: f64) -> Result<LabelNoise, ConfigError> {
        if !(noise_variance >= 0.0 && noise_variance.is_finite()) {
            return Err(ConfigError::InvalidNoise { noise_variance });
        }
        let normal = Normal::new(bias, noise_variance)
            .map_err(|_| ConfigError::InvalidNoise { noise_variance })?;
        Ok(LabelNoise { normal })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.normal.sample(rng)
    }

    /// Adds an independent draw to every element.
    pub fn perturb<R: Rng + ?Sized>(&self, values: &Matrix, rng: &mut R) -> Matrix {
        values.map_with(|x| x + self.sample(rng))
    }
}
