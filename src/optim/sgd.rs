use crate::math::matrix::Matrix;
use crate::optim::optimizer::{assert_parallel, Optimizer};

pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Plain gradient descent: `p -= lr · g`.
    fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        assert_parallel(&params, grads);
        let lr = self.learning_rate;
        for (p, g) in params.into_iter().zip(grads) {
            for (x, dx) in p.data.iter_mut().zip(&g.data) {
                *x -= lr * dx;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_moves_against_gradient() {
        let mut w = Matrix::from_rows(vec![vec![1.0, -2.0]]);
        let g = Matrix::from_rows(vec![vec![0.5, -1.0]]);
        Sgd::new(0.1).step(vec![&mut w], &[g]);
        assert_relative_eq!(w.data[0], 0.95, epsilon = 1e-12);
        assert_relative_eq!(w.data[1], -1.9, epsilon = 1e-12);
    }
}
