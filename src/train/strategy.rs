use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::autograd::{Tape, Var};
use crate::error::{PinnError, Result};
use crate::loss::{total_loss_euro, total_loss_us, LossBatches, LossRecord, Market};
use crate::network::network::{BoundNetwork, Network, Scaling, INPUT_DIM, OUTPUT_DIM};
use crate::optim::optimizer::Optimizer;
use crate::sampler::batch::SampleBatch;
use crate::sampler::domain;
use crate::sampler::noise::LabelNoise;
use crate::train::loop_fn::train_loop;
use crate::train::train_config::TrainConfig;

/// Which option a strategy prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OptionStyle {
    /// European call.
    European,
    /// American put with early exercise.
    AmericanPut,
}

impl fmt::Display for OptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionStyle::European => f.write_str("european"),
            OptionStyle::AmericanPut => f.write_str("american-put"),
        }
    }
}

/// State shared by every strategy: the validated configuration, the network
/// and its optimizer, the sampling generator and the collocation points.
pub struct PinnCore {
    pub config: TrainConfig,
    pub network: Network,
    optimizer: Box<dyn Optimizer>,
    rng: StdRng,
    pub collocation: SampleBatch,
}

impl fmt::Debug for PinnCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnCore")
            .field("config", &self.config)
            .field("network", &self.network)
            .field("collocation", &self.collocation.len())
            .finish()
    }
}

impl PinnCore {
    /// Validates `config`, then initializes the network and samples the
    /// collocation points, in that order, from the configured generator.
    pub fn new(config: TrainConfig) -> Result<PinnCore> {
        config.validate()?;
        let mut rng = config.rng();
        let network = Network::new(&config.hidden_layers, config.activation, &mut rng)
            .with_scaling(Scaling::from_config(&config));
        let optimizer = config.optimizer.build(config.lr);
        let collocation = domain::collocation_batch(&config, &mut rng);
        Ok(PinnCore {
            config,
            network,
            optimizer,
            rng,
            collocation,
        })
    }

    /// Runs the shared epoch loop against `objective`.
    fn fit<F>(&mut self, objective: F) -> Result<LossRecord>
    where
        F: for<'t> FnMut(&BoundNetwork<'t>, &'t Tape, &mut StdRng) -> Result<(Var<'t>, LossRecord)>,
    {
        info!(
            "training for {} epochs on {} collocation points",
            self.config.epochs,
            self.collocation.len()
        );
        let PinnCore {
            config,
            network,
            optimizer,
            rng,
            ..
        } = self;
        train_loop(network, optimizer.as_mut(), config, rng, objective)
    }

    /// Replaces the network with one read from `path`.
    ///
    /// # Errors
    /// `PinnError::ModelMismatch` if the stored layout, activation or input
    /// and output scaling differs from the configured one.
    pub fn load(&mut self, path: &str) -> Result<()> {
        let network = Network::load_json(path)?;
        let hidden = network.hidden_layers();
        if hidden != self.config.hidden_layers {
            return Err(PinnError::ModelMismatch(format!(
                "hidden layers {:?}, expected {:?}",
                hidden, self.config.hidden_layers
            )));
        }
        if network.activation() != Some(self.config.activation) {
            return Err(PinnError::ModelMismatch(format!(
                "activation {:?}, expected {}",
                network.activation(),
                self.config.activation
            )));
        }
        let inputs = network.layers.first().map(|layer| layer.input_size);
        let outputs = network.layers.last().map(|layer| layer.size);
        if inputs != Some(INPUT_DIM) || outputs != Some(OUTPUT_DIM) {
            return Err(PinnError::ModelMismatch(format!(
                "input width {inputs:?} and output width {outputs:?}, expected {INPUT_DIM} and {OUTPUT_DIM}"
            )));
        }
        for (i, layer) in network.layers.iter().enumerate() {
            if layer.weights.shape() != (layer.input_size, layer.size)
                || layer.biases.shape() != (1, layer.size)
            {
                return Err(PinnError::ModelMismatch(format!(
                    "layer {i} parameters do not match its declared {}×{} shape",
                    layer.input_size, layer.size
                )));
            }
        }
        let scaling = Scaling::from_config(&self.config);
        if network.scaling != scaling {
            return Err(PinnError::ModelMismatch(format!(
                "scaling {:?}, expected {:?}",
                network.scaling, scaling
            )));
        }
        self.network = network;
        debug!("loaded model from {path}");
        Ok(())
    }
}

/// Capabilities every PINN strategy offers.
///
/// Implementors provide the training objective; persistence and inference
/// are shared through the [`PinnCore`].
pub trait PinnStrategy {
    fn core(&self) -> &PinnCore;

    fn core_mut(&mut self) -> &mut PinnCore;

    /// Runs `config.epochs` optimizer steps and returns the last epoch's losses.
    fn train(&mut self) -> Result<LossRecord>;

    fn config(&self) -> &TrainConfig {
        &self.core().config
    }

    fn network(&self) -> &Network {
        &self.core().network
    }

    /// Writes the network parameters to `path` as JSON.
    fn export(&self, path: &str) -> Result<()> {
        self.network().save_json(path)?;
        info!("exported model to {path}");
        Ok(())
    }

    /// Writes the network to the configured `model_path`.
    fn export_default(&self) -> Result<()> {
        self.export(&self.config().model_path)
    }

    /// Restores network parameters previously written by [`export`](Self::export).
    fn load(&mut self, path: &str) -> Result<()> {
        self.core_mut().load(path)
    }

    /// Model values at `(s[i], t[i])`, without recording anything for
    /// differentiation.
    fn predict(&self, s: &[f64], t: &[f64]) -> Result<Vec<f64>> {
        self.network().predict(s, t)
    }
}

/// PINN for a European call.
#[derive(Debug)]
pub struct EuropeanPinn {
    core: PinnCore,
    terminal: SampleBatch,
    boundary: SampleBatch,
}

impl EuropeanPinn {
    pub fn new(config: TrainConfig) -> Result<EuropeanPinn> {
        let mut core = PinnCore::new(config)?;
        let terminal = domain::terminal_call_batch(&core.config, &mut core.rng)?;
        let boundary = domain::boundary_call_batch(&core.config, &mut core.rng)?;
        Ok(EuropeanPinn {
            core,
            terminal,
            boundary,
        })
    }

    pub fn terminal(&self) -> &SampleBatch {
        &self.terminal
    }

    pub fn boundary(&self) -> &SampleBatch {
        &self.boundary
    }
}

impl PinnStrategy for EuropeanPinn {
    fn core(&self) -> &PinnCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PinnCore {
        &mut self.core
    }

    fn train(&mut self) -> Result<LossRecord> {
        let market = Market::from(&self.core.config);
        let collocation = self.core.collocation.clone();
        let batches = LossBatches {
            terminal: &self.terminal,
            boundary: &self.boundary,
            collocation: &collocation,
        };
        self.core
            .fit(|model, tape, _| total_loss_euro(model, tape, batches, market))
    }
}

/// PINN for an American put, trained against the free-boundary
/// complementarity objective.
#[derive(Debug)]
pub struct AmericanPutPinn {
    core: PinnCore,
    terminal: SampleBatch,
    boundary: SampleBatch,
    payoff_noise: LabelNoise,
}

impl AmericanPutPinn {
    pub fn new(config: TrainConfig) -> Result<AmericanPutPinn> {
        let mut core = PinnCore::new(config)?;
        let terminal = domain::terminal_put_batch(&core.config, &mut core.rng)?;
        let boundary = domain::boundary_put_batch(&core.config, &mut core.rng)?;
        let payoff_noise = LabelNoise::new(core.config.bias, core.config.noise_variance)?;
        Ok(AmericanPutPinn {
            core,
            terminal,
            boundary,
            payoff_noise,
        })
    }

    pub fn terminal(&self) -> &SampleBatch {
        &self.terminal
    }

    pub fn boundary(&self) -> &SampleBatch {
        &self.boundary
    }
}

impl PinnStrategy for AmericanPutPinn {
    fn core(&self) -> &PinnCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PinnCore {
        &mut self.core
    }

    fn train(&mut self) -> Result<LossRecord> {
        let market = Market::from(&self.core.config);
        let noise = self.payoff_noise;
        let collocation = self.core.collocation.clone();
        let batches = LossBatches {
            terminal: &self.terminal,
            boundary: &self.boundary,
            collocation: &collocation,
        };
        self.core.fit(|model, tape, rng| {
            total_loss_us(model, tape, batches, market, &noise, rng)
        })
    }
}

/// A strategy selected at runtime by [`OptionStyle`].
#[derive(Debug)]
pub enum Strategy {
    European(EuropeanPinn),
    AmericanPut(AmericanPutPinn),
}

impl Strategy {
    pub fn new(style: OptionStyle, config: TrainConfig) -> Result<Strategy> {
        debug!("building {style} strategy");
        Ok(match style {
            OptionStyle::European => Strategy::European(EuropeanPinn::new(config)?),
            OptionStyle::AmericanPut => Strategy::AmericanPut(AmericanPutPinn::new(config)?),
        })
    }

    pub fn style(&self) -> OptionStyle {
        match self {
            Strategy::European(_) => OptionStyle::European,
            Strategy::AmericanPut(_) => OptionStyle::AmericanPut,
        }
    }
}

impl PinnStrategy for Strategy {
    fn core(&self) -> &PinnCore {
        match self {
            Strategy::European(pinn) => pinn.core(),
            Strategy::AmericanPut(pinn) => pinn.core(),
        }
    }

    fn core_mut(&mut self) -> &mut PinnCore {
        match self {
            Strategy::European(pinn) => pinn.core_mut(),
            Strategy::AmericanPut(pinn) => pinn.core_mut(),
        }
    }

    fn train(&mut self) -> Result<LossRecord> {
        match self {
            Strategy::European(pinn) => pinn.train(),
            Strategy::AmericanPut(pinn) => pinn.train(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn config() -> TrainConfig {
        TrainConfig {
            n_data: 8,
            epochs: 3,
            hidden_layers: vec![6, 6],
            seed: Some(21),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_sampling() {
        let config = TrainConfig {
            min_s: 200.0,
            ..config()
        };
        let err = Strategy::new(OptionStyle::European, config).unwrap_err();
        assert!(matches!(
            err,
            PinnError::Config(ConfigError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_batches_are_fixed_at_construction() {
        let mut pinn = AmericanPutPinn::new(config()).unwrap();
        let terminal = pinn.terminal().clone();
        let collocation = pinn.core().collocation.clone();
        pinn.train().unwrap();
        assert_eq!(pinn.terminal(), &terminal);
        assert_eq!(pinn.core().collocation, collocation);
        assert_eq!(pinn.boundary().len(), 16);
    }

    #[test]
    fn test_train_reports_style_components() {
        let mut euro = Strategy::new(OptionStyle::European, config()).unwrap();
        let record = euro.train().unwrap();
        assert_eq!(record.epoch, 3);
        assert!(record.payoff.is_none());

        let mut us = Strategy::new(OptionStyle::AmericanPut, config()).unwrap();
        assert_eq!(us.style(), OptionStyle::AmericanPut);
        let record = us.train().unwrap();
        assert!(record.payoff.is_some() && record.complementarity.is_some());
    }

    #[test]
    fn test_training_changes_parameters() {
        let mut pinn = EuropeanPinn::new(config()).unwrap();
        let before = pinn.network().clone();
        pinn.train().unwrap();
        assert_ne!(pinn.network(), &before);
    }

    #[test]
    fn test_same_seed_same_model() {
        let mut a = EuropeanPinn::new(config()).unwrap();
        let mut b = EuropeanPinn::new(config()).unwrap();
        assert_eq!(a.train().unwrap(), b.train().unwrap());
        assert_eq!(a.network(), b.network());
    }

    #[test]
    fn test_load_rejects_other_architectures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let path = path.to_str().unwrap();

        let wide = EuropeanPinn::new(TrainConfig {
            hidden_layers: vec![12],
            ..config()
        })
        .unwrap();
        wide.export(path).unwrap();

        let mut narrow = EuropeanPinn::new(config()).unwrap();
        assert!(matches!(narrow.load(path), Err(PinnError::ModelMismatch(_))));

        let sigmoid = EuropeanPinn::new(TrainConfig {
            activation: crate::activation::ActivationFunction::Sigmoid,
            ..config()
        })
        .unwrap();
        sigmoid.export(path).unwrap();
        assert!(matches!(narrow.load(path), Err(PinnError::ModelMismatch(_))));
        assert!(matches!(narrow.load("/nonexistent/model.json"), Err(PinnError::Io(_))));

        let other_strike = EuropeanPinn::new(TrainConfig { k: 80.0, ..config() }).unwrap();
        other_strike.export(path).unwrap();
        assert!(matches!(narrow.load(path), Err(PinnError::ModelMismatch(_))));
    }

    #[test]
    fn test_style_names() {
        assert_eq!(OptionStyle::AmericanPut.to_string(), "american-put");
        assert_eq!(
            serde_json::to_string(&OptionStyle::European).unwrap(),
            "\"european\""
        );
    }
}
