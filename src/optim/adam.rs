use crate::math::matrix::Matrix;
use crate::optim::optimizer::{assert_parallel, Optimizer};

#[derive(Debug)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    beta1_t: f64,
    beta2_t: f64,
    epsilon: f64,
    /// First and second moment estimates, one per parameter slot.
    v: Vec<Matrix>,
    s: Vec<Matrix>,
}

impl Adam {
    /// Creates a new `Adam` optimizer with the usual `β₁ = 0.9`, `β₂ = 0.999`,
    /// `ε = 1e-8`.
    pub fn new(learning_rate: f64) -> Self {
        Self::with_hyperparameters(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    pub fn with_hyperparameters(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            epsilon,
            v: Vec::new(),
            s: Vec::new(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        assert_parallel(&params, grads);
        if self.v.is_empty() {
            self.v = grads.iter().map(|g| Matrix::zeros(g.rows, g.cols)).collect();
            self.s = self.v.clone();
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        for (((p, g), v), s) in params
            .into_iter()
            .zip(grads)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
        {
            p.data
                .iter_mut()
                .zip(&g.data)
                .zip(v.data.iter_mut())
                .zip(s.data.iter_mut())
                .for_each(|(((p, g), v), s)| {
                    *v = b1 * *v + (1. - b1) * g;
                    *s = b2 * *s + (1. - b2) * g.powi(2);
                    *p -= step_size * *v / (s.sqrt() + eps);
                });
        }
    }
}
