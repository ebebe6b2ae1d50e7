use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BiometricError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
    #[error("no enrollment data for user {0}")]
    NoHistory(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("user {0} is already enrolled")]
    AlreadyEnrolled(String),
    #[error("storage error in {path}: {reason}")]
    Storage { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, BiometricError>;
