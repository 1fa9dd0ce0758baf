use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Dense row-major matrix of `f64`.
///
/// Sample batches are `N×1` column matrices; layer weights are
/// `input_size×size` so a batch multiplies from the left (`X · W`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix::filled(rows, cols, 0.0)
    }

    pub fn ones(rows: usize, cols: usize) -> Matrix {
        Matrix::filled(rows, cols, 1.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(2 / (fan_in + fan_out))).
    ///
    /// Keeps tanh layers out of saturation at the start of training.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::gaussian(rows, cols, (2.0 / (rows + cols) as f64).sqrt(), rng)
    }

    fn gaussian<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let data = (0..rows * cols)
            .map(|_| {
                let z: f64 = StandardNormal.sample(rng);
                z * std_dev
            })
            .collect();
        Matrix { rows, cols, data }
    }

    /// Builds an `N×1` column from a slice.
    pub fn column(values: &[f64]) -> Matrix {
        Matrix {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    pub fn from_rows(data: Vec<Vec<f64>>) -> Matrix {
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        assert!(
            data.iter().all(|row| row.len() == cols),
            "Matrix rows must all have the same length"
        );
        Matrix {
            rows,
            cols,
            data: data.into_iter().flatten().collect(),
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value of a `1×1` matrix.
    pub fn scalar(&self) -> f64 {
        assert_eq!(self.shape(), (1, 1), "scalar() requires a 1x1 matrix");
        self.data[0]
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Like `map`, for functors that carry state such as a random generator.
    pub fn map_with<F>(&self, mut functor: F) -> Matrix
    where
        F: FnMut(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Element-wise combination of two same-shape matrices.
    pub fn zip_map<F>(&self, other: &Matrix, functor: F) -> Matrix
    where
        F: Fn(f64, f64) -> f64,
    {
        assert_same_shape(self, other);
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| functor(a, b))
                .collect(),
        }
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        self.zip_map(other, |a, b| a * b)
    }

    pub fn matmul(&self, rhs: &Matrix) -> Matrix {
        if self.cols != rhs.rows {
            panic!(
                "Matrices are of incorrect sizes: {}x{} * {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            let out = &mut res.data[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                let rhs_row = &rhs.data[k * rhs.cols..(k + 1) * rhs.cols];
                for (o, &b) in out.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }
        res
    }

    /// Adds a `1×cols` row to every row.
    pub fn add_row(&self, row: &Matrix) -> Matrix {
        assert_eq!(row.rows, 1, "add_row expects a single row");
        assert_eq!(row.cols, self.cols, "add_row column count mismatch");
        let mut res = self.clone();
        for chunk in res.data.chunks_mut(self.cols.max(1)) {
            for (x, &b) in chunk.iter_mut().zip(&row.data) {
                *x += b;
            }
        }
        res
    }

    /// Column sums as a `1×cols` row.
    pub fn sum_rows(&self) -> Matrix {
        let mut res = Matrix::zeros(1, self.cols);
        for chunk in self.data.chunks(self.cols.max(1)) {
            for (acc, &x) in res.data.iter_mut().zip(chunk) {
                *acc += x;
            }
        }
        res
    }

    /// Repeats a `1×cols` row `rows` times.
    pub fn broadcast_rows(&self, rows: usize) -> Matrix {
        assert_eq!(self.rows, 1, "broadcast_rows expects a single row");
        let mut data = Vec::with_capacity(rows * self.cols);
        for _ in 0..rows {
            data.extend_from_slice(&self.data);
        }
        Matrix {
            rows,
            cols: self.cols,
            data,
        }
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.sum() / self.data.len() as f64
    }

    /// Columns side by side: `[self | rhs]`.
    pub fn concat_cols(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.rows, rhs.rows, "concat_cols row count mismatch");
        let cols = self.cols + rhs.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.extend_from_slice(&self.data[i * self.cols..(i + 1) * self.cols]);
            data.extend_from_slice(&rhs.data[i * rhs.cols..(i + 1) * rhs.cols]);
        }
        Matrix {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Columns `start..end`.
    pub fn slice_cols(&self, start: usize, end: usize) -> Matrix {
        assert!(start <= end && end <= self.cols, "slice_cols out of range");
        let cols = end - start;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.extend_from_slice(&self.data[i * self.cols + start..i * self.cols + end]);
        }
        Matrix {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Rows `start..end`.
    pub fn slice_rows(&self, start: usize, end: usize) -> Matrix {
        assert!(start <= end && end <= self.rows, "slice_rows out of range");
        Matrix {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }

    /// Stacks `rhs` under `self`.
    pub fn concat_rows(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.cols, rhs.cols, "concat_rows column count mismatch");
        let mut data = self.data.clone();
        data.extend_from_slice(&rhs.data);
        Matrix {
            rows: self.rows + rhs.rows,
            cols: self.cols,
            data,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix {
            rows: 0,
            cols: 0,
            data: vec![],
        }
    }
}

fn assert_same_shape(a: &Matrix, b: &Matrix) {
    if a.shape() != b.shape() {
        panic!(
            "Matrices are of incorrect sizes: {}x{} vs {}x{}",
            a.rows, a.cols, b.rows, b.cols
        )
    }
}

impl Add for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: &Matrix) -> Matrix {
        self.zip_map(rhs, |a, b| a + b)
    }
}

impl Sub for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: &Matrix) -> Matrix {
        self.zip_map(rhs, |a, b| a - b)
    }
}

impl Mul for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        self.matmul(rhs)
    }
}

impl Add for Matrix {
    type Output = Matrix;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl Sub for Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        self.matmul(&rhs)
    }
}
