use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{activation::activation::ActivationFunction, autograd::{Tape, Var}, math::matrix::Matrix};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    /// Shape `input_size × size`; a batch multiplies from the left.
    pub weights: Matrix,
    /// Shape `1 × size`.
    pub biases: Matrix,
    pub activator: ActivationFunction,
}

impl Layer {
    /// Xavier-initialized weights and zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        Layer {
            size,
            input_size,
            weights: Matrix::xavier(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation,
        }
    }

    /// Inference forward pass on plain values: `σ(X·W + b)`.
    pub fn feed_from(&self, input: &Matrix) -> Matrix {
        let z = input.matmul(&self.weights).add_row(&self.biases);
        z.map(|x| self.activator.function(x))
    }

    /// Registers the parameters on `tape` as tracked leaves.
    pub fn bind<'t>(&self, tape: &'t Tape) -> BoundLayer<'t> {
        BoundLayer {
            weights: tape.var(self.weights.clone()),
            biases: tape.var(self.biases.clone()),
            activator: self.activator,
        }
    }

    /// Weights then biases, in the order `BoundLayer::parameters` lists them.
    pub fn parameters_mut(&mut self) -> [&mut Matrix; 2] {
        [&mut self.weights, &mut self.biases]
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}

/// A layer whose parameters live on a tape for one loss evaluation.
#[derive(Debug, Clone, Copy)]
pub struct BoundLayer<'t> {
    pub weights: Var<'t>,
    pub biases: Var<'t>,
    pub activator: ActivationFunction,
}

impl<'t> BoundLayer<'t> {
    pub fn forward(&self, input: Var<'t>) -> Var<'t> {
        let z = input.matmul(self.weights).add_row(self.biases);
        self.activator.apply(z)
    }

    pub fn parameters(&self) -> [Var<'t>; 2] {
        [self.weights, self.biases]
    }
}
