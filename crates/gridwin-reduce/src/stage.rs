use gridwin_core::{Float, GridError, GridResult, GridStack, WeightBank};

use crate::kind::Reduction;
use crate::reducer::SlidingWindowReducer;
use crate::window::Window;

/// A pure `GridStack → GridStack` step.
pub trait Stage<T: Float>: Send + Sync {
    fn apply(&self, input: &GridStack<T>) -> GridResult<GridStack<T>>;
}

/// Multi-output cross-correlation with optional per-output bias, stride and
/// zero padding.
///
/// Input shape:  `[C, H, W]`
/// Output shape: `[O, out_h, out_w]`
/// where `out_h = (H + 2·pad_h − kh) / sh + 1`.
///
/// The weights are plain values owned by the caller; nothing here tracks or
/// updates them.
pub struct Correlate2d<T: Float> {
    pub bank: WeightBank<T>,
    pub bias: Option<Vec<T>>,
    pub stride: (usize, usize),
    pub padding: (usize, usize),
    reducer: SlidingWindowReducer,
}

impl<T: Float> Correlate2d<T> {
    pub fn new(bank: WeightBank<T>) -> Self {
        Correlate2d {
            bank,
            bias: None,
            stride: (1, 1),
            padding: (0, 0),
            reducer: SlidingWindowReducer::default(),
        }
    }

    /// One bias per output channel.
    pub fn with_bias(mut self, bias: Vec<T>) -> GridResult<Self> {
        let outputs = self.bank.dims().0;
        if bias.len() != outputs {
            return Err(GridError::ShapeMismatch {
                expected: vec![outputs],
                got: vec![bias.len()],
            });
        }
        self.bias = Some(bias);
        Ok(self)
    }

    pub fn with_stride(mut self, sh: usize, sw: usize) -> Self {
        self.stride = (sh, sw);
        self
    }

    pub fn with_padding(mut self, pad_h: usize, pad_w: usize) -> Self {
        self.padding = (pad_h, pad_w);
        self
    }

    pub fn with_reducer(mut self, reducer: SlidingWindowReducer) -> Self {
        self.reducer = reducer;
        self
    }
}

impl<T: Float> Stage<T> for Correlate2d<T> {
    fn apply(&self, input: &GridStack<T>) -> GridResult<GridStack<T>> {
        let padded = input.pad(self.padding.0, self.padding.1)?;
        let (_, _, kh, kw) = self.bank.dims();
        let out = if (kh, kw) == (1, 1) {
            self.reducer.correlate_1x1(&padded, &self.bank, self.stride)?
        } else {
            self.reducer.correlate_multi_out(&padded, &self.bank, self.stride)?
        };
        match &self.bias {
            Some(b) => out.add_channel_bias(b),
            None => Ok(out),
        }
    }
}

/// Max pooling over each channel. Stride defaults to the window size.
pub struct MaxPool2d {
    pub window: Window,
    reducer: SlidingWindowReducer,
}

impl MaxPool2d {
    pub fn new(kh: usize, kw: usize) -> Self {
        MaxPool2d {
            window: Window::new(kh, kw).with_stride(kh, kw),
            reducer: SlidingWindowReducer::default(),
        }
    }

    pub fn with_stride(mut self, sh: usize, sw: usize) -> Self {
        self.window = self.window.with_stride(sh, sw);
        self
    }
}

impl<T: Float> Stage<T> for MaxPool2d {
    fn apply(&self, input: &GridStack<T>) -> GridResult<GridStack<T>> {
        self.reducer.reduce_channels(input, &self.window, Reduction::Max)
    }
}

/// Average pooling over each channel. Stride defaults to the window size.
pub struct AvgPool2d {
    pub window: Window,
    reducer: SlidingWindowReducer,
}

impl AvgPool2d {
    pub fn new(kh: usize, kw: usize) -> Self {
        AvgPool2d {
            window: Window::new(kh, kw).with_stride(kh, kw),
            reducer: SlidingWindowReducer::default(),
        }
    }

    pub fn with_stride(mut self, sh: usize, sw: usize) -> Self {
        self.window = self.window.with_stride(sh, sw);
        self
    }
}

impl<T: Float> Stage<T> for AvgPool2d {
    fn apply(&self, input: &GridStack<T>) -> GridResult<GridStack<T>> {
        self.reducer.reduce_channels(input, &self.window, Reduction::Mean)
    }
}

/// Chains stages in order.
pub struct Pipeline<T: Float> {
    stages: Vec<Box<dyn Stage<T>>>,
}

impl<T: Float> Pipeline<T> {
    pub fn new() -> Self {
        Pipeline { stages: Vec::new() }
    }

    /// Append a stage.
    pub fn add(mut self, stage: Box<dyn Stage<T>>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T: Float> Stage<T> for Pipeline<T> {
    fn apply(&self, input: &GridStack<T>) -> GridResult<GridStack<T>> {
        let mut x = input.clone();
        for stage in &self.stages {
            x = stage.apply(&x)?;
        }
        Ok(x)
    }
}

impl<T: Float> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwin_core::Grid;

    fn arange4() -> GridStack<f64> {
        let g = Grid::new((0..16).map(|i| i as f64).collect(), 4, 4).unwrap();
        GridStack::from(g)
    }

    #[test]
    fn test_maxpool2d() {
        let out = MaxPool2d::new(2, 2).apply(&arange4()).unwrap();
        assert_eq!(out.shape().dims(), &[1, 2, 2]);
        // Max of [0,1,4,5]=5, [2,3,6,7]=7, [8,9,12,13]=13, [10,11,14,15]=15
        assert_eq!(out.data(), &[5.0, 7.0, 13.0, 15.0]);
    }

    #[test]
    fn test_avgpool2d_overlapping() {
        let out = AvgPool2d::new(3, 3).with_stride(1, 1).apply(&arange4()).unwrap();
        assert_eq!(out.shape().dims(), &[1, 2, 2]);
        assert_eq!(out.data(), &[5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn test_correlate2d_padding() {
        // 3x3 kernel with padding 1 keeps the size.
        let bank = WeightBank::new(vec![1.0; 9], 1, 1, 3, 3).unwrap();
        let conv = Correlate2d::new(bank).with_padding(1, 1);
        let out = conv.apply(&arange4()).unwrap();
        assert_eq!(out.shape().dims(), &[1, 4, 4]);
        // Top-left sees 0, 1, 4, 5.
        assert_eq!(out.get(0, 0, 0).unwrap(), 10.0);
    }

    #[test]
    fn test_correlate2d_stride_padding_shape() {
        // 8x8, kernel 3x5, padding (0, 1), stride (3, 4): (8-3)/3+1 = 2, (10-5)/4+1 = 2
        let input: GridStack<f64> = GridStack::rand(2, 8, 8, Some(1)).unwrap();
        let bank = WeightBank::rand(3, 2, 3, 5, Some(2)).unwrap();
        let conv = Correlate2d::new(bank).with_padding(0, 1).with_stride(3, 4);
        assert_eq!(conv.apply(&input).unwrap().shape().dims(), &[3, 2, 2]);
    }

    #[test]
    fn test_correlate2d_bias() {
        let bank = WeightBank::new(vec![1.0, 2.0], 2, 1, 1, 1).unwrap();
        let conv = Correlate2d::new(bank).with_bias(vec![0.5, -0.5]).unwrap();
        let out = conv.apply(&arange4()).unwrap();
        assert_eq!(out.shape().dims(), &[2, 4, 4]);
        assert_eq!(out.get(0, 1, 1).unwrap(), 5.5);
        assert_eq!(out.get(1, 1, 1).unwrap(), 9.5);

        let bank = WeightBank::<f64>::rand(2, 1, 1, 1, None).unwrap();
        assert!(Correlate2d::new(bank).with_bias(vec![0.0]).is_err());
    }

    #[test]
    fn test_pipeline() {
        let input: GridStack<f64> = GridStack::rand(1, 8, 8, Some(7)).unwrap();
        let net: Pipeline<f64> = Pipeline::new()
            .add(Box::new(Correlate2d::new(WeightBank::rand(6, 1, 3, 3, Some(1)).unwrap()).with_padding(1, 1)))
            .add(Box::new(MaxPool2d::new(2, 2)))
            .add(Box::new(Correlate2d::new(WeightBank::rand(4, 6, 1, 1, Some(2)).unwrap())))
            .add(Box::new(AvgPool2d::new(2, 2)));
        assert_eq!(net.len(), 4);
        let out = net.apply(&input).unwrap();
        assert_eq!(out.shape().dims(), &[4, 2, 2]);
    }

    #[test]
    fn test_pipeline_nested_and_errors() {
        let inner: Pipeline<f64> = Pipeline::new().add(Box::new(MaxPool2d::new(2, 2)));
        let outer: Pipeline<f64> = Pipeline::new().add(Box::new(inner)).add(Box::new(MaxPool2d::new(3, 3)));
        let input: GridStack<f64> = GridStack::rand(2, 4, 4, Some(3)).unwrap();
        // After the first pool the grid is 2x2, too small for a 3x3 window.
        assert!(matches!(outer.apply(&input), Err(GridError::InvalidWindow { .. })));

        let empty: Pipeline<f64> = Pipeline::default();
        assert!(empty.is_empty());
        assert_eq!(empty.apply(&input).unwrap(), input);
    }
}
