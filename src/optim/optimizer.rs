use serde::{Deserialize, Serialize};

use crate::math::matrix::Matrix;
use crate::optim::adam::Adam;
use crate::optim::sgd::Sgd;

/// Updates parameters in place from their gradients.
///
/// `params` and `grads` are parallel lists; the optimizer may keep per-slot
/// state, so callers must pass parameters in the same order every step.
pub trait Optimizer {
    fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]);
}

/// Selects the optimizer a strategy builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Adam => Box::new(Adam::new(learning_rate)),
            OptimizerKind::Sgd => Box::new(Sgd::new(learning_rate)),
        }
    }
}

pub(crate) fn assert_parallel(params: &[&mut Matrix], grads: &[Matrix]) {
    assert_eq!(
        params.len(),
        grads.len(),
        "optimizer received {} parameters and {} gradients",
        params.len(),
        grads.len()
    );
    for (p, g) in params.iter().zip(grads) {
        assert_eq!(p.shape(), g.shape(), "parameter and gradient shapes differ");
    }
}
