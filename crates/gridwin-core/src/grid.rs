use crate::dtype::Float;
use crate::error::{GridError, GridResult};
use crate::shape::Shape;
use crate::view::GridView;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-dimensional grid of real numbers; the input and output of every
/// sliding-window reduction.
///
/// Stores data in a flat contiguous `Vec<T>` with row-major layout, indexed
/// `(row, col)` from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Grid<T: Float> {
    data: Vec<T>,
    height: usize,
    width: usize,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Grid<T> {
    /// Create a grid from row-major data. Both dimensions must be at least 1.
    pub fn new(data: Vec<T>, height: usize, width: usize) -> GridResult<Self> {
        if height == 0 || width == 0 {
            return Err(GridError::EmptyGrid);
        }
        Self::output(data, height, width)
    }

    /// Create a reduction result. Unlike [`Grid::new`], a zero-sized axis is
    /// accepted: a window that fits no position yields an empty grid.
    pub fn output(data: Vec<T>, height: usize, width: usize) -> GridResult<Self> {
        if data.len() != cell_count(height, width)? {
            return Err(GridError::ShapeMismatch {
                expected: vec![height, width],
                got: vec![data.len()],
            });
        }
        Ok(Grid { data, height, width })
    }

    /// Create a grid from nested rows.
    pub fn from_rows(rows: &[Vec<T>]) -> GridResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        for row in rows {
            if row.len() != width {
                return Err(GridError::mismatch(&[height, width], &[height, row.len()]));
            }
        }
        let flat: Vec<T> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Grid::new(flat, height, width)
    }

    /// Create a grid filled with zeros.
    pub fn zeros(height: usize, width: usize) -> GridResult<Self> {
        Self::full(height, width, T::ZERO)
    }

    /// Create a grid filled with a constant value.
    pub fn full(height: usize, width: usize, value: T) -> GridResult<Self> {
        let n = input_cells(height, width)?;
        Ok(Grid {
            data: vec![value; n],
            height,
            width,
        })
    }

    /// Random grid with uniform distribution in [0, 1).
    pub fn rand(height: usize, width: usize, seed: Option<u64>) -> GridResult<Self> {
        let n = input_cells(height, width)?;
        Ok(Grid { data: uniform(n, seed), height, width })
    }

    /// Random grid with standard normal distribution (Box-Muller).
    pub fn randn(height: usize, width: usize, seed: Option<u64>) -> GridResult<Self> {
        let n = input_cells(height, width)?;
        let mut rng = seeded(seed);
        let mut data = Vec::with_capacity(n.saturating_add(1));
        while data.len() < n {
            let u1: f64 = rand::Rng::gen::<f64>(&mut rng).max(1e-10);
            let u2: f64 = rand::Rng::gen::<f64>(&mut rng);
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f64::consts::PI * u2;
            data.push(T::from_f64(r * theta.cos()));
            data.push(T::from_f64(r * theta.sin()));
        }
        data.truncate(n);
        Ok(Grid { data, height, width })
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(height, width)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn shape(&self) -> Shape {
        Shape::new(vec![self.height, self.width])
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// True for reduction results where no window position fit.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> GridResult<T> {
        if row >= self.height {
            return Err(GridError::IndexOutOfBounds { index: row, axis: 0, size: self.height });
        }
        if col >= self.width {
            return Err(GridError::IndexOutOfBounds { index: col, axis: 1, size: self.width });
        }
        Ok(self.data[row * self.width + col])
    }

    pub fn row(&self, row: usize) -> GridResult<&[T]> {
        if row >= self.height {
            return Err(GridError::IndexOutOfBounds { index: row, axis: 0, size: self.height });
        }
        Ok(&self.data[row * self.width..(row + 1) * self.width])
    }

    /// Nested rows, handy for assertions and display.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        if self.width == 0 {
            return vec![Vec::new(); self.height];
        }
        self.data.chunks(self.width).map(<[T]>::to_vec).collect()
    }

    /// Borrowed view for the window kernels.
    pub fn view(&self) -> GridView<'_, T> {
        GridView::new(&self.data, self.height, self.width)
    }

    // ─── Whole-grid ops ─────────────────────────────────────────────────────

    /// Matrix multiply `(m×k)·(k×n)`.
    pub fn matmul(&self, other: &Grid<T>) -> GridResult<Grid<T>> {
        let (m, k) = self.dims();
        let (k2, n) = other.dims();
        if k != k2 {
            return Err(GridError::mismatch(&[k, n], &[k2, n]));
        }

        let mut data = vec![T::ZERO; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = T::ZERO;
                for p in 0..k {
                    sum += self.data[i * k + p] * other.data[p * n + j];
                }
                data[i * n + j] = sum;
            }
        }
        Grid::output(data, m, n)
    }

    /// Zero-pad `pad_h` rows above and below and `pad_w` columns left and right.
    pub fn pad(&self, pad_h: usize, pad_w: usize) -> GridResult<Grid<T>> {
        if pad_h == 0 && pad_w == 0 {
            return Ok(self.clone());
        }
        let overflow = || GridError::ShapeMismatch {
            expected: vec![self.height, self.width],
            got: vec![pad_h, pad_w],
        };
        let height = padded_len(self.height, pad_h).ok_or_else(overflow)?;
        let width = padded_len(self.width, pad_w).ok_or_else(overflow)?;
        let mut data = vec![T::ZERO; cell_count(height, width)?];
        for r in 0..self.height {
            let dst = (r + pad_h) * width + pad_w;
            data[dst..dst + self.width]
                .copy_from_slice(&self.data[r * self.width..(r + 1) * self.width]);
        }
        Ok(Grid { data, height, width })
    }

    /// Element-wise sum of two same-shaped grids.
    pub fn add(&self, other: &Grid<T>) -> GridResult<Grid<T>> {
        self.check_same_dims(other)?;
        let data = self.data.iter().zip(&other.data).map(|(&a, &b)| a + b).collect();
        Grid::output(data, self.height, self.width)
    }

    pub fn add_scalar(&self, s: T) -> Grid<T> {
        Grid {
            data: self.data.iter().map(|&x| x + s).collect(),
            height: self.height,
            width: self.width,
        }
    }

    /// Largest absolute element-wise difference, for tolerance comparisons.
    pub fn max_abs_diff(&self, other: &Grid<T>) -> GridResult<T> {
        self.check_same_dims(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| (a - b).abs())
            .fold(T::ZERO, |acc, d| if d > acc { d } else { acc }))
    }

    fn check_same_dims(&self, other: &Grid<T>) -> GridResult<()> {
        if self.dims() != other.dims() {
            return Err(GridError::mismatch(
                &[self.height, self.width],
                &[other.height, other.width],
            ));
        }
        Ok(())
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// `n` samples uniform in [0, 1).
pub(crate) fn uniform<T: Float>(n: usize, seed: Option<u64>) -> Vec<T> {
    let mut rng = seeded(seed);
    (0..n)
        .map(|_| T::from_f64(rand::Rng::gen::<f64>(&mut rng)))
        .collect()
}

/// `height * width`, or `ShapeMismatch` when the product overflows.
fn cell_count(height: usize, width: usize) -> GridResult<usize> {
    height.checked_mul(width).ok_or(GridError::ShapeMismatch {
        expected: vec![height, width],
        got: vec![],
    })
}

/// Cell count of a constructed input grid: both axes at least 1.
fn input_cells(height: usize, width: usize) -> GridResult<usize> {
    if height == 0 || width == 0 {
        return Err(GridError::EmptyGrid);
    }
    cell_count(height, width)
}

fn padded_len(len: usize, pad: usize) -> Option<usize> {
    pad.checked_mul(2)?.checked_add(len)
}

// ─── Display ────────────────────────────────────────────────────────────────

impl<T: Float> fmt::Display for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "grid([], shape=({}, {}))", self.height, self.width);
        }
        writeln!(f, "grid([")?;
        for i in 0..self.height.min(8) {
            write!(f, "  [")?;
            for j in 0..self.width.min(8) {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:.4}", self.data[i * self.width + j])?;
            }
            if self.width > 8 {
                write!(f, ", ...")?;
            }
            writeln!(f, "],")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        write!(f, "], shape=({}, {}))", self.height, self.width)
    }
}
