use thiserror::Error;

#[derive(Error, Debug)]
pub enum PsfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid data dimensions: {bit_depth} bit, {width}x{height}, {frames_per_buffer} frame(s) per buffer")]
    InvalidGeometry {
        bit_depth: u32,
        width: usize,
        height: usize,
        frames_per_buffer: usize,
    },

    #[error("Unsupported bit depth: {0} (expected 1..=32)")]
    UnsupportedBitDepth(u32),

    #[error("Source buffer too small: need {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Fit worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Solver error: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, PsfError>;
