use crate::dtype::Float;

/// Borrowed row-major plane: a whole [`Grid`](crate::Grid), one channel of a
/// [`GridStack`](crate::GridStack), or one weight slice of a
/// [`WeightBank`](crate::WeightBank).
///
/// The window kernels assume the window `[r0, r0+kh) × [c0, c0+kw)` lies
/// inside the plane and visit its elements row-major.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a, T: Float> {
    data: &'a [T],
    height: usize,
    width: usize,
}

impl<'a, T: Float> GridView<'a, T> {
    pub(crate) fn new(data: &'a [T], height: usize, width: usize) -> Self {
        debug_assert_eq!(data.len(), height * width);
        GridView { data, height, width }
    }

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

    pub fn data(&self) -> &'a [T] {
        self.data
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> T {
        self.data[row * self.width + col]
    }

    fn window_rows(&self, r0: usize, c0: usize, kh: usize, kw: usize) -> impl Iterator<Item = &'a [T]> + 'a {
        debug_assert!(r0 + kh <= self.height && c0 + kw <= self.width);
        let (data, width) = (self.data, self.width);
        (r0..r0 + kh).map(move |r| {
            let start = r * width + c0;
            &data[start..start + kw]
        })
    }

    /// Sum of the window elements.
    pub fn window_sum(&self, r0: usize, c0: usize, kh: usize, kw: usize) -> T {
        let mut sum = T::ZERO;
        for row in self.window_rows(r0, c0, kh, kw) {
            for &v in row {
                sum += v;
            }
        }
        sum
    }

    /// Maximum of the window elements. NaN propagates.
    pub fn window_max(&self, r0: usize, c0: usize, kh: usize, kw: usize) -> T {
        let mut max_val = T::NEG_INFINITY;
        for row in self.window_rows(r0, c0, kh, kw) {
            for &v in row {
                if v.is_nan() {
                    return v;
                }
                if v > max_val {
                    max_val = v;
                }
            }
        }
        max_val
    }

    /// Element-wise product of the window with `weights`, summed. The window
    /// takes the shape of `weights`; the weights are not flipped.
    pub fn window_dot(&self, r0: usize, c0: usize, weights: GridView<'_, T>) -> T {
        let mut sum = T::ZERO;
        let rows = self.window_rows(r0, c0, weights.height, weights.width);
        for (row, w_row) in rows.zip(weights.data.chunks(weights.width)) {
            for (&x, &w) in row.iter().zip(w_row) {
                sum += x * w;
            }
        }
        sum
    }
}
