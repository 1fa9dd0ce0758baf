use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::autograd::tape::{Op, Tape};
use crate::math::matrix::Matrix;
use crate::math::normal::{norm_cdf, norm_pdf};

/// Handle to a node on a [`Tape`].
///
/// `Var` is `Copy`; every operation records a new node and returns its handle.
#[derive(Clone, Copy)]
pub struct Var<'t> {
    tape: &'t Tape,
    index: usize,
}

impl<'t> Var<'t> {
    pub(crate) fn new(tape: &'t Tape, index: usize) -> Self {
        Var { tape, index }
    }

    pub fn tape(&self) -> &'t Tape {
        self.tape
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> Matrix {
        self.tape.with_value(self.index, Matrix::clone)
    }

    /// Value of a `1×1` node, e.g. a reduced loss.
    pub fn scalar(&self) -> f64 {
        self.tape.with_value(self.index, Matrix::scalar)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.tape.shape(self.index)
    }

    pub fn rows(&self) -> usize {
        self.shape().0
    }

    pub fn cols(&self) -> usize {
        self.shape().1
    }

    pub fn is_tracked(&self) -> bool {
        self.tape.is_tracked(self.index)
    }

    fn unary(self, op: Op, f: impl FnOnce(&Matrix) -> Matrix) -> Var<'t> {
        let value = self.tape.with_value(self.index, f);
        self.tape.push(value, op)
    }

    fn binary(self, other: Var<'t>, op: Op, f: impl FnOnce(&Matrix, &Matrix) -> Matrix) -> Var<'t> {
        assert!(
            std::ptr::eq(self.tape, other.tape),
            "operands belong to different tapes"
        );
        let value = self.tape.with_values(self.index, other.index, f);
        self.tape.push(value, op)
    }

    /// Same-shape constant filled with ones.
    pub fn ones_like(&self) -> Var<'t> {
        let (rows, cols) = self.shape();
        self.tape.constant(Matrix::ones(rows, cols))
    }

    pub fn zeros_like(&self) -> Var<'t> {
        let (rows, cols) = self.shape();
        self.tape.constant(Matrix::zeros(rows, cols))
    }

    pub fn matmul(self, rhs: Var<'t>) -> Var<'t> {
        self.binary(rhs, Op::MatMul(self.index, rhs.index), |a, b| a.matmul(b))
    }

    pub fn transpose(self) -> Var<'t> {
        self.unary(Op::Transpose(self.index), Matrix::transpose)
    }

    /// Adds a `1×cols` row (a bias) to every row.
    pub fn add_row(self, row: Var<'t>) -> Var<'t> {
        self.binary(row, Op::AddRow(self.index, row.index), |a, b| a.add_row(b))
    }

    pub fn concat_cols(self, rhs: Var<'t>) -> Var<'t> {
        self.binary(rhs, Op::ConcatCols(self.index, rhs.index), |a, b| {
            a.concat_cols(b)
        })
    }

    pub fn slice_cols(self, start: usize, end: usize) -> Var<'t> {
        let op = Op::SliceCols {
            input: self.index,
            start,
            end,
        };
        self.unary(op, |a| a.slice_cols(start, end))
    }

    /// Column sums, `N×c -> 1×c`.
    pub fn sum_rows(self) -> Var<'t> {
        self.unary(Op::SumRows(self.index), Matrix::sum_rows)
    }

    /// Repeats a `1×c` row, `1×c -> rows×c`.
    pub fn broadcast_rows(self, rows: usize) -> Var<'t> {
        let op = Op::BroadcastRows {
            input: self.index,
            rows,
        };
        self.unary(op, |a| a.broadcast_rows(rows))
    }

    /// Sum of every element as a `1×1` node.
    pub fn sum(self) -> Var<'t> {
        self.unary(Op::SumAll(self.index), |a| Matrix::filled(1, 1, a.sum()))
    }

    /// Fills a `rows×cols` matrix with the value of a `1×1` node.
    pub fn broadcast_scalar(self, rows: usize, cols: usize) -> Var<'t> {
        let op = Op::BroadcastScalar {
            input: self.index,
            rows,
            cols,
        };
        self.unary(op, |a| Matrix::filled(rows, cols, a.scalar()))
    }

    /// Mean of every element as a `1×1` node.
    pub fn mean(self) -> Var<'t> {
        let n = self.value_len().max(1);
        self.sum().scale(1.0 / n as f64)
    }

    fn value_len(&self) -> usize {
        let (rows, cols) = self.shape();
        rows * cols
    }

    pub fn square(self) -> Var<'t> {
        self * self
    }

    pub fn scale(self, factor: f64) -> Var<'t> {
        self.unary(Op::Scale(self.index, factor), |a| a.map(|x| x * factor))
    }

    pub fn add_scalar(self, shift: f64) -> Var<'t> {
        self.unary(Op::AddScalar(self.index, shift), |a| a.map(|x| x + shift))
    }

    pub fn tanh(self) -> Var<'t> {
        self.unary(Op::Tanh(self.index), |a| a.map(f64::tanh))
    }

    pub fn sigmoid(self) -> Var<'t> {
        self.unary(Op::Sigmoid(self.index), |a| {
            a.map(|x| 1.0 / (1.0 + (-x).exp()))
        })
    }

    pub fn relu(self) -> Var<'t> {
        self.unary(Op::Relu(self.index), |a| a.map(|x| x.max(0.0)))
    }

    pub fn exp(self) -> Var<'t> {
        self.unary(Op::Exp(self.index), |a| a.map(f64::exp))
    }

    pub fn ln(self) -> Var<'t> {
        self.unary(Op::Ln(self.index), |a| a.map(f64::ln))
    }

    pub fn sqrt(self) -> Var<'t> {
        self.unary(Op::Sqrt(self.index), |a| a.map(f64::sqrt))
    }

    /// Standard normal CDF, element-wise.
    pub fn norm_cdf(self) -> Var<'t> {
        self.unary(Op::NormCdf(self.index), |a| a.map(norm_cdf))
    }

    /// Standard normal density, element-wise.
    pub fn norm_pdf(self) -> Var<'t> {
        self.unary(Op::NormPdf(self.index), |a| a.map(norm_pdf))
    }

    /// Element-wise minimum.
    pub fn minimum(self, other: Var<'t>) -> Var<'t> {
        self.binary(other, Op::Minimum(self.index, other.index), |a, b| {
            a.zip_map(b, f64::min)
        })
    }

    /// Element-wise product with an untracked matrix.
    pub fn mul_const(self, mask: Matrix) -> Var<'t> {
        self * self.tape.constant(mask)
    }
}

impl fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.shape();
        f.debug_struct("Var")
            .field("index", &self.index)
            .field("shape", &(rows, cols))
            .field("tracked", &self.is_tracked())
            .finish()
    }
}

impl<'t> Add for Var<'t> {
    type Output = Var<'t>;

    fn add(self, rhs: Var<'t>) -> Var<'t> {
        self.binary(rhs, Op::Add(self.index, rhs.index), |a, b| a + b)
    }
}

impl<'t> Sub for Var<'t> {
    type Output = Var<'t>;

    fn sub(self, rhs: Var<'t>) -> Var<'t> {
        self.binary(rhs, Op::Sub(self.index, rhs.index), |a, b| a - b)
    }
}

/// Element-wise product.
impl<'t> Mul for Var<'t> {
    type Output = Var<'t>;

    fn mul(self, rhs: Var<'t>) -> Var<'t> {
        self.binary(rhs, Op::Mul(self.index, rhs.index), |a, b| a.hadamard(b))
    }
}

impl<'t> Div for Var<'t> {
    type Output = Var<'t>;

    fn div(self, rhs: Var<'t>) -> Var<'t> {
        self.binary(rhs, Op::Div(self.index, rhs.index), |a, b| {
            a.zip_map(b, |x, y| x / y)
        })
    }
}

impl<'t> Neg for Var<'t> {
    type Output = Var<'t>;

    fn neg(self) -> Var<'t> {
        self.unary(Op::Neg(self.index), |a| a.map(|x| -x))
    }
}

impl<'t> Add<f64> for Var<'t> {
    type Output = Var<'t>;

    fn add(self, rhs: f64) -> Var<'t> {
        self.add_scalar(rhs)
    }
}

impl<'t> Sub<f64> for Var<'t> {
    type Output = Var<'t>;

    fn sub(self, rhs: f64) -> Var<'t> {
        self.add_scalar(-rhs)
    }
}

impl<'t> Mul<f64> for Var<'t> {
    type Output = Var<'t>;

    fn mul(self, rhs: f64) -> Var<'t> {
        self.scale(rhs)
    }
}

impl<'t> Mul<Var<'t>> for f64 {
    type Output = Var<'t>;

    fn mul(self, rhs: Var<'t>) -> Var<'t> {
        rhs.scale(self)
    }
}

impl<'t> Sub<Var<'t>> for f64 {
    type Output = Var<'t>;

    fn sub(self, rhs: Var<'t>) -> Var<'t> {
        (-rhs).add_scalar(self)
    }
}
