use serde::{Deserialize, Serialize};
use std::fmt;

use crate::autograd::Var;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    #[default]
    Tanh,
    Sigmoid,
    Identity,
    /// Piecewise linear: its second derivative vanishes almost everywhere, so
    /// a PDE residual built on it loses the diffusion term.
    #[serde(rename = "relu")]
    ReLU,
}

impl ActivationFunction {
    /// Element-wise activation on plain values (inference path).
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::Identity => x,
            ActivationFunction::ReLU => x.max(0.0),
        }
    }

    /// Element-wise activation recorded on the tape.
    pub fn apply<'t>(&self, z: Var<'t>) -> Var<'t> {
        match self {
            ActivationFunction::Tanh => z.tanh(),
            ActivationFunction::Sigmoid => z.sigmoid(),
            ActivationFunction::Identity => z,
            ActivationFunction::ReLU => z.relu(),
        }
    }

    /// True when the activation has a non-trivial second derivative.
    pub fn is_smooth(&self) -> bool {
        !matches!(self, ActivationFunction::ReLU | ActivationFunction::Identity)
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Identity => "identity",
            ActivationFunction::ReLU => "relu",
        };
        f.write_str(name)
    }
}
