use crate::autograd::tape::{Op, Tape};
use crate::autograd::var::Var;
use crate::error::{PinnError, Result};
use crate::math::matrix::Matrix;

impl Tape {
    /// Gradients of `output` with respect to each of `inputs`.
    ///
    /// The adjoint of `output` is seeded with ones, so for a non-scalar output
    /// this is the vector-Jacobian product with a ones vector (for an
    /// element-wise map of a batch, the per-sample derivative). Each returned
    /// gradient has its input's shape; inputs `output` does not depend on get
    /// zeros.
    ///
    /// Every backward rule is itself recorded on the tape. With
    /// `create_graph = true` the returned gradients are tracked and can be
    /// differentiated again; otherwise they come back as constants.
    ///
    /// # Errors
    /// `PinnError::UntrackedTensor` if an input was created without tracking.
    pub fn grad<'t>(
        &'t self,
        output: Var<'t>,
        inputs: &[Var<'t>],
        create_graph: bool,
    ) -> Result<Vec<Var<'t>>> {
        assert!(
            std::ptr::eq(self, output.tape()),
            "output belongs to a different tape"
        );
        if let Some(untracked) = inputs.iter().find(|v| !v.is_tracked()) {
            return Err(PinnError::UntrackedTensor {
                node: untracked.index(),
            });
        }

        let last = output.index();
        let needed = self.needed_mask(last, inputs);
        let mut adjoints: Vec<Option<Var<'t>>> = vec![None; last + 1];
        if needed[last] {
            adjoints[last] = Some(output.ones_like());
        }

        for index in (0..=last).rev() {
            let Some(g) = adjoints[index] else { continue };
            if !needed[index] {
                continue;
            }
            let node = Var::new(self, index);
            for (operand, contribution) in self.backward_rule(node, g, &needed) {
                adjoints[operand] = Some(match adjoints[operand] {
                    Some(acc) => acc + contribution,
                    None => contribution,
                });
            }
        }

        let grads = inputs
            .iter()
            .map(|input| {
                let g = adjoints.get(input.index()).copied().flatten();
                match (g, create_graph) {
                    (Some(g), true) => g,
                    (Some(g), false) => self.constant(g.value()),
                    (None, _) => input.zeros_like(),
                }
            })
            .collect();
        Ok(grads)
    }

    /// Marks nodes that lie between an input and `last`.
    fn needed_mask(&self, last: usize, inputs: &[Var<'_>]) -> Vec<bool> {
        let mut needed = vec![false; last + 1];
        for input in inputs {
            if input.index() <= last {
                needed[input.index()] = true;
            }
        }
        let nodes = self.nodes.borrow();
        for index in 0..=last {
            if needed[index] || !nodes[index].tracked {
                continue;
            }
            needed[index] = nodes[index]
                .op
                .operands()
                .iter()
                .flatten()
                .any(|&operand| needed[operand]);
        }
        needed
    }

    /// Adjoint contributions of `node` (with adjoint `g`) to its needed operands.
    fn backward_rule<'t>(
        &'t self,
        node: Var<'t>,
        g: Var<'t>,
        needed: &[bool],
    ) -> Vec<(usize, Var<'t>)> {
        let var = |index: usize| Var::new(self, index);
        let mut out = Vec::with_capacity(2);
        let mut emit = |operand: usize, contribution: &dyn Fn() -> Var<'t>| {
            if needed[operand] {
                out.push((operand, contribution()));
            }
        };

        match self.op(node.index()) {
            Op::Leaf => {}
            Op::Add(a, b) => {
                emit(a, &|| g);
                emit(b, &|| g);
            }
            Op::Sub(a, b) => {
                emit(a, &|| g);
                emit(b, &|| -g);
            }
            Op::Mul(a, b) => {
                emit(a, &|| g * var(b));
                emit(b, &|| g * var(a));
            }
            Op::Div(a, b) => {
                emit(a, &|| g / var(b));
                emit(b, &|| -(g * node / var(b)));
            }
            Op::Neg(a) => emit(a, &|| -g),
            Op::Scale(a, factor) => emit(a, &|| g.scale(factor)),
            Op::AddScalar(a, _) => emit(a, &|| g),
            Op::MatMul(a, b) => {
                emit(a, &|| g.matmul(var(b).transpose()));
                emit(b, &|| var(a).transpose().matmul(g));
            }
            Op::Transpose(a) => emit(a, &|| g.transpose()),
            Op::AddRow(a, row) => {
                emit(a, &|| g);
                emit(row, &|| g.sum_rows());
            }
            Op::ConcatCols(a, b) => {
                let split = self.shape(a).1;
                let total = split + self.shape(b).1;
                emit(a, &|| g.slice_cols(0, split));
                emit(b, &|| g.slice_cols(split, total));
            }
            Op::SliceCols { input, start, end } => {
                let (rows, total) = self.shape(input);
                emit(input, &|| {
                    let mut padded = g;
                    if start > 0 {
                        padded = self.constant(Matrix::zeros(rows, start)).concat_cols(padded);
                    }
                    if end < total {
                        padded = padded.concat_cols(self.constant(Matrix::zeros(rows, total - end)));
                    }
                    padded
                });
            }
            Op::SumRows(a) => {
                let rows = self.shape(a).0;
                emit(a, &|| g.broadcast_rows(rows));
            }
            Op::BroadcastRows { input, .. } => emit(input, &|| g.sum_rows()),
            Op::SumAll(a) => {
                let (rows, cols) = self.shape(a);
                emit(a, &|| g.broadcast_scalar(rows, cols));
            }
            Op::BroadcastScalar { input, .. } => emit(input, &|| g.sum()),
            Op::Tanh(a) => emit(a, &|| g * (1.0 - node.square())),
            Op::Sigmoid(a) => emit(a, &|| g * node * (1.0 - node)),
            Op::Relu(a) => {
                emit(a, &|| {
                    let mask = self.with_value(a, |x| x.map(|v| if v > 0.0 { 1.0 } else { 0.0 }));
                    g.mul_const(mask)
                });
            }
            Op::Exp(a) => emit(a, &|| g * node),
            Op::Ln(a) => emit(a, &|| g / var(a)),
            Op::Sqrt(a) => emit(a, &|| (g / node).scale(0.5)),
            Op::NormCdf(a) => emit(a, &|| g * var(a).norm_pdf()),
            Op::NormPdf(a) => emit(a, &|| -(g * var(a) * node)),
            Op::Minimum(a, b) => {
                // Ties split the adjoint evenly.
                let mask_a = self.with_values(a, b, |x, y| {
                    x.zip_map(y, |p, q| match p.partial_cmp(&q) {
                        Some(std::cmp::Ordering::Less) => 1.0,
                        Some(std::cmp::Ordering::Equal) => 0.5,
                        _ => 0.0,
                    })
                });
                let mask_b = mask_a.map(|m| 1.0 - m);
                emit(a, &|| g.mul_const(mask_a.clone()));
                emit(b, &|| g.mul_const(mask_b.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn column(values: &[f64]) -> Matrix {
        Matrix::column(values)
    }

    #[test]
    fn test_polynomial_first_and_second_derivative() {
        let tape = Tape::new();
        let x = tape.var(column(&[-1.5, 0.0, 2.0]));
        // y = x^3 + 2x
        let y = x * x * x + x.scale(2.0);

        let dy = tape.grad(y, &[x], true).unwrap()[0];
        let d2y = tape.grad(dy, &[x], true).unwrap()[0];

        for (i, &xv) in [-1.5, 0.0, 2.0].iter().enumerate() {
            assert_relative_eq!(dy.value().data[i], 3.0 * xv * xv + 2.0, epsilon = 1e-12);
            assert_relative_eq!(d2y.value().data[i], 6.0 * xv, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tanh_second_derivative() {
        let tape = Tape::new();
        let points = [-0.7, 0.1, 1.3];
        let x = tape.var(column(&points));
        let y = x.tanh();

        let dy = tape.grad(y, &[x], true).unwrap()[0];
        let d2y = tape.grad(dy, &[x], true).unwrap()[0];

        for (i, &xv) in points.iter().enumerate() {
            let t = f64::tanh(xv);
            assert_relative_eq!(dy.value().data[i], 1.0 - t * t, epsilon = 1e-12);
            assert_relative_eq!(d2y.value().data[i], -2.0 * t * (1.0 - t * t), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_matmul_gradients_match_transposes() {
        let tape = Tape::new();
        let a = tape.var(Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
        let w = tape.var(Matrix::from_rows(vec![vec![0.5, -1.0, 2.0], vec![1.5, 0.0, -0.5]]));
        let loss = a.matmul(w).sum();

        let grads = tape.grad(loss, &[a, w], false).unwrap();
        // d/dA sum(AW) = 1·Wᵀ, d/dW = Aᵀ·1
        assert_eq!(grads[0].value().data, vec![1.5, 1.0, 1.5, 1.0]);
        assert_eq!(grads[1].value().data, vec![4.0, 4.0, 4.0, 6.0, 6.0, 6.0]);
        assert!(!grads[0].is_tracked());
    }

    #[test]
    fn test_concat_slice_and_bias_route_gradients() {
        let tape = Tape::new();
        let s = tape.var(column(&[1.0, 2.0]));
        let t = tape.var(column(&[3.0, 4.0]));
        let b = tape.var(Matrix::from_rows(vec![vec![0.0, 0.0]]));
        let x = s.concat_cols(t).add_row(b);
        let y = (x.slice_cols(1, 2).scale(3.0) + x.slice_cols(0, 1)).mean();

        let grads = tape.grad(y, &[s, t, b], false).unwrap();
        assert_eq!(grads[0].value().data, vec![0.5, 0.5]);
        assert_eq!(grads[1].value().data, vec![1.5, 1.5]);
        assert_eq!(grads[2].value().data, vec![1.0, 3.0]);
    }

    #[test]
    fn test_normal_cdf_derivatives() {
        let tape = Tape::new();
        let x = tape.var(column(&[-0.5, 0.8]));
        let y = x.norm_cdf();
        let dy = tape.grad(y, &[x], true).unwrap()[0];
        let d2y = tape.grad(dy, &[x], false).unwrap()[0];

        for (i, &xv) in [-0.5_f64, 0.8].iter().enumerate() {
            let pdf = (-0.5 * xv * xv).exp() / (2.0 * std::f64::consts::PI).sqrt();
            assert_relative_eq!(dy.value().data[i], pdf, epsilon = 1e-12);
            assert_relative_eq!(d2y.value().data[i], -xv * pdf, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_relu_and_minimum_are_piecewise() {
        let tape = Tape::new();
        let a = tape.var(column(&[-1.0, 2.0, 3.0]));
        let b = tape.var(column(&[0.0, 1.0, 3.0]));
        let y = a.relu().sum() + a.minimum(b).sum();

        let grads = tape.grad(y, &[a, b], false).unwrap();
        assert_eq!(grads[0].value().data, vec![1.0, 1.0, 1.5]);
        assert_eq!(grads[1].value().data, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_untracked_input_is_rejected() {
        let tape = Tape::new();
        let x = tape.constant(column(&[1.0]));
        let y = x.square();
        let err = tape.grad(y, &[x], true).unwrap_err();
        assert!(matches!(err, PinnError::UntrackedTensor { node } if node == x.index()));
    }

    #[test]
    fn test_unused_input_gets_zero_gradient() {
        let tape = Tape::new();
        let x = tape.var(column(&[1.0, 2.0]));
        let z = tape.var(column(&[5.0, 6.0]));
        let y = x.exp();
        let grads = tape.grad(y, &[z], false).unwrap();
        assert_eq!(grads[0].value().data, vec![0.0, 0.0]);
    }

    #[test]
    fn test_gradient_of_gradient_wrt_parameter() {
        // f(x, w) = tanh(w x); d/dw of (df/dx) = (1 - t²) - 2 w x t (1 - t²)
        let tape = Tape::new();
        let x = tape.var(Matrix::filled(1, 1, 0.4));
        let w = tape.var(Matrix::filled(1, 1, 1.7));
        let f = x.matmul(w).tanh();
        let dfdx = tape.grad(f, &[x], true).unwrap()[0];
        let mixed = tape.grad(dfdx, &[w], false).unwrap()[0].scalar();

        let t = f64::tanh(0.4 * 1.7);
        let expected = (1.0 - t * t) - 2.0 * 1.7 * 0.4 * t * (1.0 - t * t);
        assert_relative_eq!(mixed, expected, epsilon = 1e-12);
    }
}
