use crate::dtype::Float;
use crate::error::{GridError, GridResult};
use crate::grid::{uniform, Grid};
use crate::shape::Shape;
use crate::view::GridView;

use serde::{Deserialize, Serialize};

/// `C` same-shaped grids stored contiguously as `C × H × W`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct GridStack<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Float> GridStack<T> {
    pub fn new(data: Vec<T>, channels: usize, height: usize, width: usize) -> GridResult<Self> {
        if channels == 0 || height == 0 || width == 0 {
            return Err(GridError::EmptyGrid);
        }
        let shape = Shape::new(vec![channels, height, width]);
        if data.len() != shape.numel()? {
            return Err(GridError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(GridStack { data, shape })
    }

    /// Stack grids along a new leading channel axis. All grids must share
    /// their spatial dimensions.
    pub fn from_grids(grids: Vec<Grid<T>>) -> GridResult<Self> {
        let first = grids.first().ok_or(GridError::EmptyGrid)?;
        let (h, w) = first.dims();
        let channels = grids.len();
        let mut data = Vec::with_capacity(channels * h * w);
        for g in grids {
            if g.dims() != (h, w) {
                return Err(GridError::ShapeMismatch {
                    expected: vec![h, w],
                    got: vec![g.height(), g.width()],
                });
            }
            data.extend(g.into_data());
        }
        Self::from_output(data, channels, h, w)
    }

    /// Like [`GridStack::new`] but accepts zero spatial size, as produced by
    /// a reduction whose window fits no position.
    pub fn from_output(data: Vec<T>, channels: usize, height: usize, width: usize) -> GridResult<Self> {
        let shape = Shape::new(vec![channels, height, width]);
        if channels == 0 {
            return Err(GridError::EmptyGrid);
        }
        if data.len() != shape.numel()? {
            return Err(GridError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(GridStack { data, shape })
    }

    /// Random stack, uniform in [0, 1). Every dimension must be at least 1.
    pub fn rand(channels: usize, height: usize, width: usize, seed: Option<u64>) -> GridResult<Self> {
        if channels == 0 || height == 0 || width == 0 {
            return Err(GridError::EmptyGrid);
        }
        let shape = Shape::new(vec![channels, height, width]);
        let data = uniform(shape.numel()?, seed);
        Ok(GridStack { data, shape })
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.shape.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `(height, width)` shared by every channel.
    pub fn spatial_dims(&self) -> (usize, usize) {
        let d = self.shape.dims();
        (d[1], d[2])
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, channel: usize, row: usize, col: usize) -> GridResult<T> {
        Ok(self.data[self.shape.offset(&[channel, row, col])?])
    }

    /// Copy of channel `c` as a standalone grid.
    pub fn channel(&self, c: usize) -> GridResult<Grid<T>> {
        let (h, w) = self.spatial_dims();
        if c >= self.len() {
            return Err(GridError::IndexOutOfBounds { index: c, axis: 0, size: self.len() });
        }
        Grid::output(self.data[c * h * w..(c + 1) * h * w].to_vec(), h, w)
    }

    /// Borrowed view of channel `c`.
    pub fn channel_view(&self, c: usize) -> GridResult<GridView<'_, T>> {
        let (h, w) = self.spatial_dims();
        if c >= self.len() {
            return Err(GridError::IndexOutOfBounds { index: c, axis: 0, size: self.len() });
        }
        Ok(GridView::new(&self.data[c * h * w..(c + 1) * h * w], h, w))
    }

    pub fn channels(&self) -> GridResult<Vec<Grid<T>>> {
        (0..self.len()).map(|c| self.channel(c)).collect()
    }

    /// Zero-pad every channel.
    pub fn pad(&self, pad_h: usize, pad_w: usize) -> GridResult<GridStack<T>> {
        if pad_h == 0 && pad_w == 0 {
            return Ok(self.clone());
        }
        let padded = self
            .channels()?
            .iter()
            .map(|g| g.pad(pad_h, pad_w))
            .collect::<GridResult<Vec<_>>>()?;
        GridStack::from_grids(padded)
    }

    /// Add `bias[c]` to every element of channel `c`.
    pub fn add_channel_bias(&self, bias: &[T]) -> GridResult<GridStack<T>> {
        if bias.len() != self.len() {
            return Err(GridError::ShapeMismatch {
                expected: vec![self.len()],
                got: vec![bias.len()],
            });
        }
        let (h, w) = self.spatial_dims();
        let plane = h * w;
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, &x)| x + bias[i / plane])
            .collect();
        GridStack::from_output(data, self.len(), h, w)
    }
}

impl<T: Float> From<Grid<T>> for GridStack<T> {
    fn from(grid: Grid<T>) -> Self {
        let (h, w) = grid.dims();
        GridStack {
            data: grid.into_data(),
            shape: Shape::new(vec![1, h, w]),
        }
    }
}

/// `O` weight stacks of shape `C × kh × kw`, one per output channel of a
/// multi-output cross-correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct WeightBank<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Float> WeightBank<T> {
    pub fn new(data: Vec<T>, outputs: usize, channels: usize, kh: usize, kw: usize) -> GridResult<Self> {
        if outputs == 0 || channels == 0 {
            return Err(GridError::EmptyGrid);
        }
        if kh == 0 || kw == 0 {
            return Err(GridError::EmptyWindow);
        }
        let shape = Shape::new(vec![outputs, channels, kh, kw]);
        if data.len() != shape.numel()? {
            return Err(GridError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(WeightBank { data, shape })
    }

    pub fn from_stacks(stacks: Vec<GridStack<T>>) -> GridResult<Self> {
        let first = stacks.first().ok_or(GridError::EmptyGrid)?;
        let inner = first.shape().to_vec();
        let outputs = stacks.len();
        let mut data = Vec::with_capacity(outputs * first.data().len());
        for s in &stacks {
            s.shape().ensure(&inner)?;
            data.extend_from_slice(s.data());
        }
        WeightBank::new(data, outputs, inner[0], inner[1], inner[2])
    }

    /// Random bank, uniform in [0, 1). Validated like [`WeightBank::new`].
    pub fn rand(outputs: usize, channels: usize, kh: usize, kw: usize, seed: Option<u64>) -> GridResult<Self> {
        if outputs == 0 || channels == 0 {
            return Err(GridError::EmptyGrid);
        }
        if kh == 0 || kw == 0 {
            return Err(GridError::EmptyWindow);
        }
        let shape = Shape::new(vec![outputs, channels, kh, kw]);
        let data = uniform(shape.numel()?, seed);
        Ok(WeightBank { data, shape })
    }

    /// `(outputs, channels, kh, kw)`.
    pub fn dims(&self) -> (usize, usize, usize, usize) {
        let d = self.shape.dims();
        (d[0], d[1], d[2], d[3])
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Weight stack feeding output channel `o`.
    pub fn output(&self, o: usize) -> GridResult<GridStack<T>> {
        let (outputs, c, kh, kw) = self.dims();
        if o >= outputs {
            return Err(GridError::IndexOutOfBounds { index: o, axis: 0, size: outputs });
        }
        let len = c * kh * kw;
        GridStack::new(self.data[o * len..(o + 1) * len].to_vec(), c, kh, kw)
    }

    /// Borrowed `kh × kw` weights pairing input channel `c` with output `o`.
    pub fn weight_view(&self, o: usize, c: usize) -> GridResult<GridView<'_, T>> {
        let (_, _, kh, kw) = self.dims();
        let start = self.shape.offset(&[o, c, 0, 0])?;
        Ok(GridView::new(&self.data[start..start + kh * kw], kh, kw))
    }

    /// The `O × C` matrix of a 1×1 bank.
    pub fn as_matrix(&self) -> GridResult<Grid<T>> {
        let (outputs, c, kh, kw) = self.dims();
        if (kh, kw) != (1, 1) {
            return Err(GridError::ShapeMismatch {
                expected: vec![outputs, c, 1, 1],
                got: self.shape.to_vec(),
            });
        }
        Grid::new(self.data.clone(), outputs, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_channels() {
        let a: Grid<f64> = Grid::full(2, 3, 1.0).unwrap();
        let b: Grid<f64> = Grid::full(2, 3, 2.0).unwrap();
        let s = GridStack::from_grids(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.spatial_dims(), (2, 3));
        assert_eq!(s.channel(1).unwrap(), b);
        assert_eq!(s.get(0, 1, 2).unwrap(), 1.0);
        assert!(s.channel(2).is_err());
    }

    #[test]
    fn test_stack_mismatched_grids() {
        let a: Grid<f64> = Grid::zeros(2, 3).unwrap();
        let b: Grid<f64> = Grid::zeros(3, 2).unwrap();
        assert!(matches!(
            GridStack::from_grids(vec![a, b]),
            Err(GridError::ShapeMismatch { .. })
        ));
        assert_eq!(GridStack::<f64>::from_grids(vec![]), Err(GridError::EmptyGrid));
    }

    #[test]
    fn test_stack_pad() {
        let s: GridStack<f64> = GridStack::rand(3, 4, 4, Some(1)).unwrap();
        let p = s.pad(1, 1).unwrap();
        assert_eq!(p.shape().dims(), &[3, 6, 6]);
        assert_eq!(p.get(2, 1, 1).unwrap(), s.get(2, 0, 0).unwrap());
    }

    #[test]
    fn test_bank() {
        let bank: WeightBank<f64> =
            WeightBank::new((0..12).map(|i| i as f64).collect(), 3, 2, 1, 2).unwrap();
        assert_eq!(bank.dims(), (3, 2, 1, 2));
        let w1 = bank.output(1).unwrap();
        assert_eq!(w1.data(), &[4.0, 5.0, 6.0, 7.0]);
        assert!(bank.as_matrix().is_err());

        let rebuilt = WeightBank::from_stacks(vec![
            bank.output(0).unwrap(),
            bank.output(1).unwrap(),
            bank.output(2).unwrap(),
        ])
        .unwrap();
        assert_eq!(rebuilt, bank);
    }

    #[test]
    fn test_channel_bias() {
        let s: GridStack<f64> = GridStack::new(vec![0.0; 8], 2, 2, 2).unwrap();
        let b = s.add_channel_bias(&[1.0, -1.0]).unwrap();
        assert_eq!(b.data(), &[1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);
        assert!(s.add_channel_bias(&[1.0]).is_err());
    }

    #[test]
    fn test_views() {
        let s: GridStack<f64> = GridStack::new((0..8).map(|i| i as f64).collect(), 2, 2, 2).unwrap();
        assert_eq!(s.channel_view(1).unwrap().data(), &[4.0, 5.0, 6.0, 7.0]);

        let bank: WeightBank<f64> =
            WeightBank::new((0..8).map(|i| i as f64).collect(), 2, 2, 1, 2).unwrap();
        assert_eq!(bank.weight_view(1, 0).unwrap().data(), &[4.0, 5.0]);
        assert!(bank.weight_view(2, 0).is_err());
    }

    #[test]
    fn test_bank_zero_kernel() {
        assert_eq!(WeightBank::<f64>::new(vec![], 1, 1, 0, 2), Err(GridError::EmptyWindow));
    }

    #[test]
    fn test_rand_rejects_empty() {
        assert_eq!(GridStack::<f64>::rand(0, 4, 4, Some(1)), Err(GridError::EmptyGrid));
        assert_eq!(GridStack::<f64>::rand(2, 4, 0, Some(1)), Err(GridError::EmptyGrid));
        assert_eq!(WeightBank::<f64>::rand(0, 2, 3, 3, None), Err(GridError::EmptyGrid));
        assert_eq!(WeightBank::<f64>::rand(1, 2, 3, 0, None), Err(GridError::EmptyWindow));
        assert!(matches!(
            GridStack::<f64>::rand(usize::MAX, 2, 2, None),
            Err(GridError::ShapeMismatch { .. })
        ));

        let s = GridStack::<f32>::rand(2, 3, 4, Some(9)).unwrap();
        assert_eq!(s, GridStack::rand(2, 3, 4, Some(9)).unwrap());
        assert!(s.data().iter().all(|&v| (0.0..1.0).contains(&v)));
    }
}
