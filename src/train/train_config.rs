use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{ConfigError, Result};
use crate::optim::OptimizerKind;

/// Immutable run configuration: domain, market, noise model and training
/// hyperparameters.
///
/// Deserializing rejects unknown keys, and the market/domain keys have no
/// default, so a JSON file must name them all. The mathematical spellings
/// (`min_S`, `K`, `T`, `N_data`, ...) are accepted as aliases.
///
/// # Defaults
/// - `hidden_layers`: `[64, 64]`
/// - `activation`: `tanh`
/// - `optimizer`: `adam`
/// - `bias`, `noise_variance`: `0.0` (noiseless targets)
/// - `log_interval`: `100`
/// - `model_path`: `"model.json"`
/// - `upper_boundary_multiplier`: `2.0` (upper boundary at `2 · max_s`)
/// - `seed`: none (entropy-seeded sampling and initialization)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    #[serde(alias = "min_S")]
    pub min_s: f64,
    #[serde(alias = "max_S")]
    pub max_s: f64,
    /// Strike.
    #[serde(alias = "K")]
    pub k: f64,
    /// Maturity in years.
    #[serde(alias = "T")]
    pub t: f64,
    /// Risk-free rate.
    pub r: f64,
    /// Volatility.
    pub sigma: f64,
    /// Samples per batch.
    #[serde(alias = "N_data")]
    pub n_data: usize,
    /// Mean of the Gaussian label noise.
    #[serde(default)]
    pub bias: f64,
    /// Standard deviation of the Gaussian label noise, despite the name.
    #[serde(default)]
    pub noise_variance: f64,
    pub lr: f64,
    pub epochs: usize,
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default)]
    pub activation: ActivationFunction,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(default = "default_upper_boundary_multiplier")]
    pub upper_boundary_multiplier: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_hidden_layers() -> Vec<usize> {
    vec![64, 64]
}

fn default_log_interval() -> usize {
    100
}

fn default_model_path() -> String {
    "model.json".to_string()
}

fn default_upper_boundary_multiplier() -> f64 {
    2.0
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            min_s: 0.0,
            max_s: 100.0,
            k: 50.0,
            t: 1.0,
            r: 0.05,
            sigma: 0.2,
            n_data: 256,
            bias: 0.0,
            noise_variance: 0.0,
            lr: 1e-3,
            epochs: 1000,
            hidden_layers: default_hidden_layers(),
            log_interval: default_log_interval(),
            model_path: default_model_path(),
            activation: ActivationFunction::default(),
            optimizer: OptimizerKind::default(),
            upper_boundary_multiplier: default_upper_boundary_multiplier(),
            seed: None,
        }
    }
}

impl TrainConfig {
    /// Checks every invariant; the first violation is returned.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let scalars = [
            ("min_s", self.min_s),
            ("max_s", self.max_s),
            ("k", self.k),
            ("t", self.t),
            ("r", self.r),
            ("sigma", self.sigma),
            ("bias", self.bias),
            ("noise_variance", self.noise_variance),
            ("lr", self.lr),
            ("upper_boundary_multiplier", self.upper_boundary_multiplier),
        ];
        if let Some((field, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field: *field });
        }

        if self.min_s >= self.max_s {
            return Err(ConfigError::InvalidDomain {
                min_s: self.min_s,
                max_s: self.max_s,
            });
        }
        if self.t <= 0.0 {
            return Err(ConfigError::InvalidMaturity { maturity: self.t });
        }
        if self.sigma <= 0.0 {
            return Err(ConfigError::InvalidVolatility { sigma: self.sigma });
        }
        if self.n_data == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        if self.lr <= 0.0 {
            return Err(ConfigError::InvalidLearningRate { lr: self.lr });
        }
        if self.log_interval == 0 {
            return Err(ConfigError::InvalidLogInterval);
        }
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(ConfigError::InvalidHiddenLayers {
                widths: self.hidden_layers.clone(),
            });
        }
        if self.noise_variance < 0.0 {
            return Err(ConfigError::InvalidNoise {
                noise_variance: self.noise_variance,
            });
        }
        if self.upper_boundary_multiplier <= 0.0 {
            return Err(ConfigError::InvalidBoundaryMultiplier {
                multiplier: self.upper_boundary_multiplier,
            });
        }
        if !self.activation.is_smooth() {
            return Err(ConfigError::NonSmoothActivation {
                activation: self.activation.to_string(),
            });
        }
        Ok(())
    }

    /// Price level of the upper boundary curve.
    pub fn upper_boundary_s(&self) -> f64 {
        self.upper_boundary_multiplier * self.max_s
    }

    /// Seeded generator when `seed` is set, entropy-seeded otherwise.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Reads and validates a configuration file.
    pub fn load_json(path: &str) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
