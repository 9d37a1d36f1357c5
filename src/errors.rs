use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },
    #[error("read timed out: expected {expected} bytes, got {got} before timeout")]
    ReadTimeout { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, DriverError>;
