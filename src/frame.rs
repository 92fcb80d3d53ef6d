use ndarray::{Array2, ArrayView2};

use crate::error::Error;

/// Single-channel activity image; any non-zero byte is an active pixel.
///
/// The upstream collaborator is expected to have already thresholded the
/// frame (motion difference, edge map), so the detector only ever looks at
/// zero vs non-zero.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Array2<u8>,
}

impl Frame {
    #[inline]
    pub fn new(pixels: Array2<u8>) -> Self {
        Self { pixels }
    }

    /// Wraps a raw row-major byte buffer.
    pub fn from_raw(rows: usize, cols: usize, data: Vec<u8>) -> Result<Self, Error> {
        let len = data.len();
        let pixels = Array2::from_shape_vec((rows, cols), data)
            .map_err(|_| Error::FrameSize { rows, cols, len })?;

        Ok(Self { pixels })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.pixels.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn pixels(&self) -> ArrayView2<'_, u8> {
        self.pixels.view()
    }
}
