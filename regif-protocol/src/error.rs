use std::io;

use thiserror::Error;

/// Errors that may occur when building or decoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A burst must carry between 1 and [`MAX_BURST_LEN`](crate::MAX_BURST_LEN) words.
    #[error("Invalid burst length {0}, must be between 1 and 64")]
    InvalidBurstLength(usize),
    /// The number of reply bytes does not match the requested burst length.
    #[error("Reply has {got} bytes, expected {expected}")]
    ReplyLength { expected: usize, got: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}
