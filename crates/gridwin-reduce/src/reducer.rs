use gridwin_core::{Float, Grid, GridError, GridResult, GridStack, GridView, WeightBank};
use rayon::prelude::*;

use crate::config::ReducerConfig;
use crate::kind::Reduction;
use crate::window::Window;

/// Computes a reduction over every window position of a grid or channel
/// stack.
///
/// Every call is pure: inputs are only read, and each output cell depends on
/// its own window alone. The config decides whether output rows are filled
/// serially or on the rayon pool; both paths produce identical results.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindowReducer {
    config: ReducerConfig,
}

#[derive(Debug, Clone, Copy)]
enum PoolOp {
    Max,
    Mean,
}

impl PoolOp {
    fn from_kind(kind: Reduction) -> Option<Self> {
        match kind {
            Reduction::Max => Some(PoolOp::Max),
            Reduction::Mean => Some(PoolOp::Mean),
            Reduction::WeightedSum => None,
        }
    }
}

impl SlidingWindowReducer {
    pub fn new(config: ReducerConfig) -> Self {
        SlidingWindowReducer { config }
    }

    /// Reduce every `window` position of `grid`.
    ///
    /// `weights` is required for [`Reduction::WeightedSum`] and must have the
    /// window's shape exactly; it is ignored for `Max` and `Mean`.
    pub fn reduce<T: Float>(
        &self,
        grid: &Grid<T>,
        window: &Window,
        kind: Reduction,
        weights: Option<&Grid<T>>,
    ) -> GridResult<Grid<T>> {
        let (h, w) = grid.dims();
        window.validate(h, w)?;
        let (ho, wo) = window.output_dims(h, w);
        let (sh, sw) = window.stride;
        let src = grid.view();

        let data = match PoolOp::from_kind(kind) {
            Some(op) => self.fill(ho, wo, |i, j| pool_cell(src, window, op, i, j)),
            None => {
                let wv = require_weights(weights, window.kernel)?;
                self.fill(ho, wo, |i, j| src.window_dot(i * sh, j * sw, wv))
            }
        };

        log::debug!(
            "reduce {kind}: {h}x{w} window {:?} stride {:?} -> {ho}x{wo}",
            window.kernel,
            window.stride
        );
        Grid::output(data, ho, wo)
    }

    /// Apply `Max` or `Mean` to each channel independently; the channel count
    /// is preserved. `WeightedSum` has no per-channel weights here and fails
    /// with `ShapeMismatch`.
    pub fn reduce_channels<T: Float>(
        &self,
        stack: &GridStack<T>,
        window: &Window,
        kind: Reduction,
    ) -> GridResult<GridStack<T>> {
        let (h, w) = stack.spatial_dims();
        window.validate(h, w)?;
        let op = PoolOp::from_kind(kind).ok_or(GridError::ShapeMismatch {
            expected: vec![window.kernel.0, window.kernel.1],
            got: vec![],
        })?;
        let (ho, wo) = window.output_dims(h, w);
        let channels = stack.len();
        let views = channel_views(stack)?;

        let data = self.fill(channels * ho, wo, |r, j| {
            pool_cell(views[r / ho], window, op, r % ho, j)
        });

        log::debug!("reduce_channels {kind}: {channels}x{h}x{w} -> {channels}x{ho}x{wo}");
        GridStack::from_output(data, channels, ho, wo)
    }

    /// Multi-input-channel cross-correlation: per-channel weighted sums,
    /// added across channels into a single output grid.
    ///
    /// `weights` is a `C × kh × kw` stack with the same channel count as
    /// `stack`.
    pub fn correlate_multi_in<T: Float>(
        &self,
        stack: &GridStack<T>,
        weights: &GridStack<T>,
        stride: (usize, usize),
    ) -> GridResult<Grid<T>> {
        let (kh, kw) = weights.spatial_dims();
        if weights.len() != stack.len() {
            return Err(GridError::ShapeMismatch {
                expected: vec![stack.len(), kh, kw],
                got: weights.shape().to_vec(),
            });
        }
        let window = Window::new(kh, kw).with_stride(stride.0, stride.1);
        let (h, w) = stack.spatial_dims();
        window.validate(h, w)?;
        let (ho, wo) = window.output_dims(h, w);
        let (sh, sw) = stride;
        let xs = channel_views(stack)?;
        let ws = channel_views(weights)?;

        let data = self.fill(ho, wo, |i, j| {
            let mut acc = T::ZERO;
            for (x, wv) in xs.iter().zip(&ws) {
                acc += x.window_dot(i * sh, j * sw, *wv);
            }
            acc
        });

        log::debug!("correlate_multi_in: {}x{h}x{w} kernel {kh}x{kw} -> {ho}x{wo}", stack.len());
        Grid::output(data, ho, wo)
    }

    /// Multi-output-channel cross-correlation: one multi-input correlation
    /// per weight stack of `bank`, stacked along a new leading axis of size
    /// `O`.
    pub fn correlate_multi_out<T: Float>(
        &self,
        stack: &GridStack<T>,
        bank: &WeightBank<T>,
        stride: (usize, usize),
    ) -> GridResult<GridStack<T>> {
        let (outputs, channels, kh, kw) = check_bank(stack, bank)?;
        let window = Window::new(kh, kw).with_stride(stride.0, stride.1);
        let (h, w) = stack.spatial_dims();
        window.validate(h, w)?;
        let (ho, wo) = window.output_dims(h, w);
        let (sh, sw) = stride;
        let xs = channel_views(stack)?;
        let ws = (0..outputs)
            .map(|o| {
                (0..channels)
                    .map(|c| bank.weight_view(o, c))
                    .collect::<GridResult<Vec<_>>>()
            })
            .collect::<GridResult<Vec<Vec<_>>>>()?;

        let data = self.fill(outputs * ho, wo, |r, j| {
            let (o, i) = (r / ho, r % ho);
            let mut acc = T::ZERO;
            for (x, wv) in xs.iter().zip(&ws[o]) {
                acc += x.window_dot(i * sh, j * sw, *wv);
            }
            acc
        });

        log::debug!(
            "correlate_multi_out: {channels}x{h}x{w} bank {outputs}x{channels}x{kh}x{kw} -> {outputs}x{ho}x{wo}"
        );
        GridStack::from_output(data, outputs, ho, wo)
    }

    /// 1×1 cross-correlation as a matrix product: the `O × C` weight matrix
    /// times the `C × (Ho·Wo)` matrix of (stride-subsampled) pixels.
    ///
    /// Matches [`correlate_multi_out`](Self::correlate_multi_out) up to
    /// floating-point summation order. Unlike the direct path it materialises
    /// the pixel matrix.
    pub fn correlate_1x1<T: Float>(
        &self,
        stack: &GridStack<T>,
        bank: &WeightBank<T>,
        stride: (usize, usize),
    ) -> GridResult<GridStack<T>> {
        let (outputs, channels, _, _) = check_bank(stack, bank)?;
        let weights = bank.as_matrix()?;
        let window = Window::new(1, 1).with_stride(stride.0, stride.1);
        let (h, w) = stack.spatial_dims();
        window.validate(h, w)?;
        let (ho, wo) = window.output_dims(h, w);
        let (sh, sw) = stride;

        let pixels = if stride == (1, 1) {
            Grid::output(stack.data().to_vec(), channels, h * w)?
        } else {
            let mut data = Vec::with_capacity(channels * ho * wo);
            for x in channel_views(stack)? {
                for i in 0..ho {
                    for j in 0..wo {
                        data.push(x.at(i * sh, j * sw));
                    }
                }
            }
            Grid::output(data, channels, ho * wo)?
        };

        let out = weights.matmul(&pixels)?;
        log::debug!("correlate_1x1: {channels}x{h}x{w} -> {outputs}x{ho}x{wo}");
        GridStack::from_output(out.into_data(), outputs, ho, wo)
    }

    /// Allocate a `rows × cols` buffer and fill it row-major with `cell`.
    fn fill<T, F>(&self, rows: usize, cols: usize, cell: F) -> Vec<T>
    where
        T: Float,
        F: Fn(usize, usize) -> T + Sync,
    {
        let cells = rows * cols;
        if cells == 0 {
            return Vec::new();
        }
        let mut out = vec![T::ZERO; cells];
        if self.config.use_parallel(cells) {
            log::trace!("filling {rows}x{cols} output in parallel");
            out.par_chunks_mut(cols).enumerate().for_each(|(r, row)| {
                for (c, slot) in row.iter_mut().enumerate() {
                    *slot = cell(r, c);
                }
            });
        } else {
            for (r, row) in out.chunks_mut(cols).enumerate() {
                for (c, slot) in row.iter_mut().enumerate() {
                    *slot = cell(r, c);
                }
            }
        }
        out
    }
}

#[inline]
fn pool_cell<T: Float>(src: GridView<'_, T>, window: &Window, op: PoolOp, i: usize, j: usize) -> T {
    let (kh, kw) = window.kernel;
    let (r0, c0) = (i * window.stride.0, j * window.stride.1);
    match op {
        PoolOp::Max => src.window_max(r0, c0, kh, kw),
        PoolOp::Mean => src.window_sum(r0, c0, kh, kw) / T::from_usize(kh * kw),
    }
}

fn require_weights<T: Float>(
    weights: Option<&Grid<T>>,
    kernel: (usize, usize),
) -> GridResult<GridView<'_, T>> {
    let expected = vec![kernel.0, kernel.1];
    match weights {
        None => Err(GridError::ShapeMismatch { expected, got: vec![] }),
        Some(w) if w.dims() != kernel => Err(GridError::ShapeMismatch {
            expected,
            got: vec![w.height(), w.width()],
        }),
        Some(w) => Ok(w.view()),
    }
}

fn channel_views<T: Float>(stack: &GridStack<T>) -> GridResult<Vec<GridView<'_, T>>> {
    (0..stack.len()).map(|c| stack.channel_view(c)).collect()
}

fn check_bank<T: Float>(
    stack: &GridStack<T>,
    bank: &WeightBank<T>,
) -> GridResult<(usize, usize, usize, usize)> {
    let dims = bank.dims();
    let (outputs, channels, kh, kw) = dims;
    if channels != stack.len() {
        return Err(GridError::ShapeMismatch {
            expected: vec![outputs, stack.len(), kh, kw],
            got: bank.shape().to_vec(),
        });
    }
    Ok(dims)
}
