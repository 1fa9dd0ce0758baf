//! Error types for configuration, differentiation, pricing and persistence.

use thiserror::Error;

use crate::sampler::batch::BatchKind;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, PinnError>;

/// Violated `TrainConfig` invariants. Detected once, before any sampling or training.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid price domain: min_s = {min_s} must be below max_s = {max_s}")]
    InvalidDomain { min_s: f64, max_s: f64 },

    #[error("Invalid maturity: T = {maturity} must be positive")]
    InvalidMaturity { maturity: f64 },

    #[error("Invalid volatility: σ = {sigma} must be positive")]
    InvalidVolatility { sigma: f64 },

    #[error("Invalid sample count: n_data must be at least 1")]
    EmptyBatch,

    #[error("Invalid learning rate: {lr}")]
    InvalidLearningRate { lr: f64 },

    #[error("Invalid log interval: must be at least 1")]
    InvalidLogInterval,

    #[error("Invalid hidden layers {widths:?}: need at least one layer and no zero widths")]
    InvalidHiddenLayers { widths: Vec<usize> },

    #[error("Invalid noise standard deviation: {noise_variance}")]
    InvalidNoise { noise_variance: f64 },

    #[error("Invalid upper boundary multiplier: {multiplier}")]
    InvalidBoundaryMultiplier { multiplier: f64 },

    #[error("Non-finite value for `{field}`")]
    NonFinite { field: &'static str },

    #[error("Activation `{activation}` has a zero second derivative almost everywhere")]
    NonSmoothActivation { activation: String },
}

/// Failures of the reference pricer collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PricerError {
    #[error("Invalid pricer input: {0}")]
    InvalidInput(String),

    #[error("Finite-difference system is singular at time step {step}")]
    SingularSystem { step: usize },
}

/// The crate's error type.
#[derive(Debug, Error)]
pub enum PinnError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A derivative was requested with respect to a tensor created without
    /// gradient tracking.
    #[error("Cannot differentiate with respect to untracked tensor (tape node {node})")]
    UntrackedTensor { node: usize },

    #[error(transparent)]
    Pricer(#[from] PricerError),

    #[error("Loaded model does not match the configured architecture: {0}")]
    ModelMismatch(String),

    #[error("The {kind} batch carries no target")]
    MissingTarget { kind: BatchKind },

    #[error("Prediction inputs have different lengths: {s} prices, {t} times")]
    InputLengthMismatch { s: usize, t: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidDomain {
            min_s: 100.0,
            max_s: 50.0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid price domain: min_s = 100 must be below max_s = 50"
        );
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: PinnError = ConfigError::InvalidVolatility { sigma: 0.0 }.into();
        assert!(err.to_string().contains("σ = 0"));
        assert!(matches!(err, PinnError::Config(_)));
    }

    #[test]
    fn test_pricer_error_converts() {
        let err: PinnError = PricerError::SingularSystem { step: 3 }.into();
        assert!(matches!(
            err,
            PinnError::Pricer(PricerError::SingularSystem { step: 3 })
        ));
    }
}
