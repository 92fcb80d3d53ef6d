use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("frame buffer of {len} bytes does not match {rows}x{cols} dimensions")]
    FrameSize {
        rows: usize,
        cols: usize,
        len: usize,
    },

    #[error("frame buffer is not contiguous in standard row-major layout")]
    FrameLayout,
}
