use gridwin_core::{GridError, GridResult};
use serde::{Deserialize, Serialize};

fn unit_stride() -> (usize, usize) {
    (1, 1)
}

/// Window shape `(kh, kw)` and the step `(sh, sw)` between successive
/// window positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub kernel: (usize, usize),
    #[serde(default = "unit_stride")]
    pub stride: (usize, usize),
}

impl Window {
    /// Window of `kh × kw` with stride `(1, 1)`.
    pub fn new(kh: usize, kw: usize) -> Self {
        Window {
            kernel: (kh, kw),
            stride: unit_stride(),
        }
    }

    pub fn square(k: usize) -> Self {
        Window::new(k, k)
    }

    pub fn with_stride(mut self, sh: usize, sw: usize) -> Self {
        self.stride = (sh, sw);
        self
    }

    /// Check the window against a `height × width` grid.
    ///
    /// A kernel with a zero axis is `EmptyWindow`. A kernel larger than the
    /// grid on either axis, or a zero stride, is `InvalidWindow`.
    pub fn validate(&self, height: usize, width: usize) -> GridResult<()> {
        let (kh, kw) = self.kernel;
        if kh == 0 || kw == 0 {
            return Err(GridError::EmptyWindow);
        }
        let (sh, sw) = self.stride;
        if kh > height || kw > width || sh == 0 || sw == 0 {
            return Err(GridError::InvalidWindow {
                kernel: self.kernel,
                stride: self.stride,
                grid: (height, width),
            });
        }
        Ok(())
    }

    /// `(Ho, Wo)` with `Ho = (H - kh) / sh + 1` and `Wo = (W - kw) / sw + 1`.
    /// An axis the kernel does not fit on has size 0.
    pub fn output_dims(&self, height: usize, width: usize) -> (usize, usize) {
        (
            out_dim(height, self.kernel.0, self.stride.0, 0),
            out_dim(width, self.kernel.1, self.stride.1, 0),
        )
    }
}

/// Output length along one axis after zero padding `padding` on both sides.
pub fn out_dim(input: usize, kernel: usize, stride: usize, padding: usize) -> usize {
    let padded = padding.saturating_mul(2).saturating_add(input);
    if kernel > padded || stride == 0 {
        return 0;
    }
    (padded - kernel) / stride + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dims_law() {
        // (H, W, kh, kw, sh, sw) -> (Ho, Wo)
        let cases = [
            ((3, 3, 2, 2, 1, 1), (2, 2)),
            ((8, 8, 3, 5, 3, 4), (2, 2)),
            ((8, 8, 8, 8, 1, 1), (1, 1)),
            ((4, 4, 2, 2, 2, 2), (2, 2)),
            ((5, 7, 2, 3, 2, 2), (2, 3)),
            ((6, 9, 1, 1, 4, 5), (2, 2)),
            ((10, 1, 3, 1, 3, 1), (3, 1)),
        ];
        for ((h, w, kh, kw, sh, sw), expected) in cases {
            let win = Window::new(kh, kw).with_stride(sh, sw);
            win.validate(h, w).unwrap();
            assert_eq!(win.output_dims(h, w), expected, "case {:?}", (h, w, kh, kw, sh, sw));
            assert_eq!(expected.0, (h - kh) / sh + 1);
            assert_eq!(expected.1, (w - kw) / sw + 1);
        }
    }

    #[test]
    fn test_validate_errors() {
        assert_eq!(Window::new(0, 3).validate(4, 4), Err(GridError::EmptyWindow));
        assert!(matches!(
            Window::new(5, 2).validate(4, 4),
            Err(GridError::InvalidWindow { .. })
        ));
        assert!(matches!(
            Window::new(2, 5).validate(4, 4),
            Err(GridError::InvalidWindow { .. })
        ));
        assert!(matches!(
            Window::new(2, 2).with_stride(0, 1).validate(4, 4),
            Err(GridError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_validate_huge_kernel() {
        // kh * kw overflows usize.
        assert_eq!(
            Window::new(usize::MAX, 2).validate(3, 3),
            Err(GridError::InvalidWindow { kernel: (usize::MAX, 2), stride: (1, 1), grid: (3, 3) })
        );
        // Half of usize::MAX rounded up, times 2, wraps to zero.
        assert!(matches!(
            Window::new(usize::MAX / 2 + 1, 2).validate(3, 3),
            Err(GridError::InvalidWindow { .. })
        ));
        assert_eq!(Window::new(usize::MAX, 0).validate(3, 3), Err(GridError::EmptyWindow));
        assert_eq!(out_dim(3, 2, 1, usize::MAX), usize::MAX - 1);
    }

    #[test]
    fn test_out_dim_padding() {
        // 3x3 kernel, padding 1, stride 1 keeps the size.
        assert_eq!(out_dim(4, 3, 1, 1), 4);
        // 8 + 2*2 = 12, (12 - 5) / 3 + 1 = 3
        assert_eq!(out_dim(8, 5, 3, 2), 3);
        assert_eq!(out_dim(2, 3, 1, 0), 0);
    }

    #[test]
    fn test_deserialize_default_stride() {
        let w: Window = serde_json::from_str(r#"{"kernel": [2, 3]}"#).unwrap();
        assert_eq!(w, Window::new(2, 3));
    }
}
