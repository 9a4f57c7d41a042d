use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("capture failed: {0}")]
    Capture(String),
}
