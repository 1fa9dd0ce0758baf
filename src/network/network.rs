use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    activation::activation::ActivationFunction,
    autograd::{Tape, Var},
    error::{PinnError, Result},
    layers::dense::{BoundLayer, Layer},
    math::matrix::Matrix,
    network::approximator::Approximator,
    train::train_config::TrainConfig,
};

/// Input width: price and time.
pub const INPUT_DIM: usize = 2;
/// Output width: option value.
pub const OUTPUT_DIM: usize = 1;

/// Fixed normalization around the layers: `S` is divided by `s` and `t` by
/// `t` before the first layer, the last layer's output is multiplied by
/// `value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub s: f64,
    pub t: f64,
    pub value: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling {
            s: 1.0,
            t: 1.0,
            value: 1.0,
        }
    }
}

impl Scaling {
    /// Maps the price domain and maturity onto unit ranges and measures
    /// values in strikes. Expects a validated configuration.
    pub fn from_config(config: &TrainConfig) -> Scaling {
        Scaling {
            s: config.max_s.abs().max(config.min_s.abs()),
            t: config.t,
            value: if config.k > 0.0 { config.k } else { 1.0 },
        }
    }
}

/// Feed-forward network mapping `(S, t)` to an option value.
///
/// Hidden layers share one activation; the output layer is linear so the
/// prediction is unconstrained in sign and magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub scaling: Scaling,
}

impl Network {
    pub fn new<R: Rng + ?Sized>(
        hidden_layers: &[usize],
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Network {
        let mut dims = Vec::with_capacity(hidden_layers.len() + 2);
        dims.push(INPUT_DIM);
        dims.extend_from_slice(hidden_layers);
        dims.push(OUTPUT_DIM);

        let last = dims.len() - 2;
        let layers: Vec<Layer> = dims
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let act = if i == last { ActivationFunction::Identity } else { activation };
                Layer::new(pair[1], pair[0], act, rng)
            })
            .collect();

        let network = Network {
            layers,
            scaling: Scaling::default(),
        };
        debug!(
            "built network {:?} with {} parameters",
            dims,
            network.parameter_count()
        );
        network
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Network {
        self.scaling = scaling;
        self
    }

    /// Widths of the hidden layers.
    pub fn hidden_layers(&self) -> Vec<usize> {
        let n = self.layers.len().saturating_sub(1);
        self.layers[..n].iter().map(|layer| layer.size).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Tape-free forward pass. `s` and `t` are `N×1` columns.
    pub fn forward(&self, s: &Matrix, t: &Matrix) -> Matrix {
        let Scaling { s: s_scale, t: t_scale, value } = self.scaling;
        let (s_factor, t_factor) = (1.0 / s_scale, 1.0 / t_scale);
        let input = s.map(|x| x * s_factor).concat_cols(&t.map(|x| x * t_factor));
        self.layers
            .iter()
            .fold(input, |current, layer| layer.feed_from(&current))
            .map(|x| x * value)
    }

    /// Option values at the points `(s[i], t[i])`.
    pub fn predict(&self, s: &[f64], t: &[f64]) -> Result<Vec<f64>> {
        if s.len() != t.len() {
            return Err(PinnError::InputLengthMismatch {
                s: s.len(),
                t: t.len(),
            });
        }
        if s.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.forward(&Matrix::column(s), &Matrix::column(t)).data)
    }

    /// Activation shared by the hidden layers.
    pub fn activation(&self) -> Option<ActivationFunction> {
        self.layers.first().map(|layer| layer.activator)
    }

    /// Registers every parameter on `tape`.
    pub fn bind<'t>(&self, tape: &'t Tape) -> BoundNetwork<'t> {
        BoundNetwork {
            layers: self.layers.iter().map(|layer| layer.bind(tape)).collect(),
            scaling: self.scaling,
        }
    }

    /// Every parameter, layer by layer, weights before biases.
    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect()
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// A network whose parameters are leaves on a tape.
#[derive(Debug, Clone)]
pub struct BoundNetwork<'t> {
    pub layers: Vec<BoundLayer<'t>>,
    pub scaling: Scaling,
}

impl<'t> BoundNetwork<'t> {
    /// Parameter leaves in the order of `Network::parameters_mut`.
    pub fn parameters(&self) -> Vec<Var<'t>> {
        self.layers
            .iter()
            .flat_map(|layer| layer.parameters())
            .collect()
    }
}

impl<'t> Approximator<'t> for BoundNetwork<'t> {
    fn evaluate(&self, s: Var<'t>, t: Var<'t>) -> Var<'t> {
        let Scaling { s: s_scale, t: t_scale, value } = self.scaling;
        let input = s.scale(1.0 / s_scale).concat_cols(t.scale(1.0 / t_scale));
        self.layers
            .iter()
            .fold(input, |current, layer| layer.forward(current))
            .scale(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network() -> Network {
        let mut rng = StdRng::seed_from_u64(42);
        Network::new(&[8, 5], ActivationFunction::Tanh, &mut rng)
    }

    #[test]
    fn test_layout_follows_hidden_widths() {
        let net = network();
        assert_eq!(net.layers.len(), 3);
        assert_eq!(net.hidden_layers(), vec![8, 5]);
        assert_eq!(net.layers[0].input_size, INPUT_DIM);
        assert_eq!(net.layers[2].size, OUTPUT_DIM);
        assert_eq!(net.layers[2].activator, ActivationFunction::Identity);
        assert_eq!(net.parameter_count(), (2 * 8 + 8) + (8 * 5 + 5) + (5 + 1));
        assert_eq!(net.clone().parameters_mut().len(), 6);
    }

    #[test]
    fn test_tape_and_inference_paths_agree() {
        let net = network();
        let s = Matrix::column(&[10.0, 55.0, 90.0]);
        let t = Matrix::column(&[0.0, 0.5, 1.0]);

        let tape = Tape::new();
        let bound = net.bind(&tape);
        let on_tape = bound.evaluate(tape.constant(s.clone()), tape.constant(t.clone()));

        let plain = net.forward(&s, &t);
        assert_eq!(plain.shape(), (3, 1));
        assert_eq!(on_tape.value(), plain);
        assert_eq!(bound.parameters().len(), 6);
    }

    #[test]
    fn test_scaling_normalizes_inputs_and_output() {
        let scaling = Scaling {
            s: 100.0,
            t: 2.0,
            value: 50.0,
        };
        let unscaled = network();
        let scaled = network().with_scaling(scaling);
        let s = Matrix::column(&[10.0, 55.0, 90.0]);
        let t = Matrix::column(&[0.0, 0.5, 1.0]);

        let expected = unscaled
            .forward(&s.map(|x| x / 100.0), &t.map(|x| x / 2.0))
            .map(|x| x * 50.0);
        for (a, b) in scaled.forward(&s, &t).data.iter().zip(&expected.data) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }

        let tape = Tape::new();
        let on_tape = scaled
            .bind(&tape)
            .evaluate(tape.constant(s.clone()), tape.constant(t.clone()));
        assert_eq!(on_tape.value(), scaled.forward(&s, &t));
    }

    #[test]
    fn test_scaling_follows_domain_maturity_and_strike() {
        let config = TrainConfig::default();
        let scaling = Scaling::from_config(&config);
        assert_eq!(scaling.s, config.max_s);
        assert_eq!(scaling.t, config.t);
        assert_eq!(scaling.value, config.k);
        assert_eq!(network().scaling, Scaling::default());
    }

    #[test]
    fn test_predict_checks_lengths() {
        let net = network();
        let values = net.predict(&[10.0, 20.0], &[0.0, 0.5]).unwrap();
        assert_eq!(values, net.forward(&Matrix::column(&[10.0, 20.0]), &Matrix::column(&[0.0, 0.5])).data);
        assert!(net.predict(&[], &[]).unwrap().is_empty());
        assert!(matches!(
            net.predict(&[1.0], &[0.0, 1.0]),
            Err(PinnError::InputLengthMismatch { s: 1, t: 2 })
        ));
        assert_eq!(net.activation(), Some(ActivationFunction::Tanh));
    }

    #[test]
    fn test_json_round_trip() {
        let net = network();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let path = path.to_str().unwrap();

        net.save_json(path).unwrap();
        let loaded = Network::load_json(path).unwrap();
        assert_eq!(loaded, net);
    }
}
