use thiserror::Error;

/// Every way a paint run can fail. An empty wall mask is deliberately absent:
/// painting nothing is a valid outcome, not an error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid color code: {0:?} (expected 6 hex digits, optionally prefixed with '#')")]
    InvalidColor(String),

    #[error("Dimension mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Buffer size mismatch for {width}x{height} RGBA: expected {expected} bytes, got {actual}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run was cancelled before completion")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
