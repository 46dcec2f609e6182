use std::fmt;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::error::{LstmError, Result};
use crate::layers::{relu, sigmoid, tanh};

/// Dense row-major matrix of `f64`.
///
/// Both dimensions are at least one and the backing storage always holds
/// exactly `rows * cols` values. Every operation that produces a matrix
/// returns a freshly allocated one; nothing hands out aliases of another
/// matrix's storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

fn alloc(rows: usize, cols: usize) -> Result<Vec<f64>> {
    if rows == 0 || cols == 0 {
        return Err(LstmError::InvalidArgument(format!(
            "matrix dimensions must be positive, got {rows}x{cols}"
        )));
    }
    let len = rows
        .checked_mul(cols)
        .ok_or(LstmError::AllocationFailure { rows, cols })?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| LstmError::AllocationFailure { rows, cols })?;
    data.resize(len, 0.0);
    Ok(data)
}

impl Matrix {
    /// Allocate a zero-filled `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let data = alloc(rows, cols)?;
        Ok(Matrix { rows, cols, data })
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(LstmError::InvalidArgument(format!(
                "matrix dimensions must be positive, got {rows}x{cols}"
            )));
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(LstmError::shape("from_vec", (rows, cols), (data.len(), 1)));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Build a column vector (`values.len() x 1`).
    pub fn column(values: &[f64]) -> Result<Self> {
        Matrix::from_vec(values.len(), 1, values.to_vec())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row-major view of the values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    fn check_index(&self, r: usize, c: usize) -> Result<usize> {
        if r >= self.rows || c >= self.cols {
            return Err(LstmError::IndexOutOfBounds {
                row: r,
                col: c,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(r * self.cols + c)
    }

    pub fn get(&self, r: usize, c: usize) -> Result<f64> {
        let idx = self.check_index(r, c)?;
        Ok(self.data[idx])
    }

    pub fn set(&mut self, r: usize, c: usize, v: f64) -> Result<()> {
        let idx = self.check_index(r, c)?;
        self.data[idx] = v;
        Ok(())
    }

    pub fn fill(&mut self, v: f64) {
        for x in self.data.iter_mut() {
            *x = v;
        }
    }

    pub fn zero(&mut self) {
        self.fill(0.0);
    }

    /// Overwrite this matrix with the contents of `src`, which must have the
    /// same shape.
    pub fn copy_from(&mut self, src: &Matrix) -> Result<()> {
        self.same_shape("copy_from", src)?;
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Fill with values drawn uniformly from `[min, max)`.
    pub fn fill_uniform<R: Rng + ?Sized>(&mut self, min: f64, max: f64, rng: &mut R) -> Result<()> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(LstmError::InvalidArgument(format!(
                "uniform range [{min}, {max}) is empty or not finite"
            )));
        }
        let dist = Uniform::new(min, max);
        for v in self.data.iter_mut() {
            *v = dist.sample(rng);
        }
        Ok(())
    }

    /// Xavier/Glorot uniform initialisation:
    /// `limit = sqrt(6 / (rows + cols)) * scale`, values in `[-limit, limit)`.
    pub fn xavier_init<R: Rng + ?Sized>(&mut self, scale: f64, rng: &mut R) -> Result<()> {
        let limit = (6.0 / (self.rows + self.cols) as f64).sqrt() * scale;
        self.fill_uniform(-limit, limit, rng)
    }

    fn same_shape(&self, op: &'static str, other: &Matrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(LstmError::shape(op, self.shape(), other.shape()));
        }
        Ok(())
    }

    pub fn matmul(a: &Matrix, b: &Matrix) -> Result<Matrix> {
        if a.cols != b.rows {
            return Err(LstmError::shape("matmul", a.shape(), b.shape()));
        }
        let mut out = alloc(a.rows, b.cols)?;
        for i in 0..a.rows {
            let a_row = &a.data[i * a.cols..(i + 1) * a.cols];
            for j in 0..b.cols {
                let mut sum = 0.0;
                for (k, &a_val) in a_row.iter().enumerate() {
                    sum += a_val * b.data[k * b.cols + j];
                }
                out[i * b.cols + j] = sum;
            }
        }
        Ok(Matrix {
            rows: a.rows,
            cols: b.cols,
            data: out,
        })
    }

    fn zip_with(&self, other: &Matrix, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
        self.same_shape(op, other)?;
        let mut v = alloc(self.rows, self.cols)?;
        for (out, (&a, &b)) in v.iter_mut().zip(self.data.iter().zip(other.data.iter())) {
            *out = f(a, b);
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: v,
        })
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Elementwise product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "hadamard", |a, b| a * b)
    }

    /// In-place elementwise accumulation, `self += other`.
    pub fn add_assign(&mut self, other: &Matrix) -> Result<()> {
        self.same_shape("add_assign", other)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(())
    }

    pub fn transpose(&self) -> Result<Matrix> {
        let mut v = alloc(self.cols, self.rows)?;
        for i in 0..self.rows {
            for j in 0..self.cols {
                v[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Ok(Matrix {
            rows: self.cols,
            cols: self.rows,
            data: v,
        })
    }

    pub fn scale(&mut self, scalar: f64) {
        for v in self.data.iter_mut() {
            *v *= scalar;
        }
    }

    pub fn map_inplace(&mut self, f: impl Fn(f64) -> f64) {
        for v in self.data.iter_mut() {
            *v = f(*v);
        }
    }

    /// Element-wise logistic function, in place.
    pub fn apply_sigmoid(&mut self) {
        sigmoid::forward_matrix(self);
    }

    pub fn apply_tanh(&mut self) {
        tanh::forward_matrix(self);
    }

    pub fn apply_relu(&mut self) {
        relu::forward_matrix(self);
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{}:", self.rows, self.cols)?;
        for row in self.data.chunks(self.cols) {
            for v in row {
                write!(f, "{v:8.4} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
