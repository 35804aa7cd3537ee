//! Error types for gscd

use thiserror::Error;

/// Core error type for gscd utilities
#[derive(Debug, Error)]
pub enum GscError {
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Invalid mock time '{value}': {message}")]
    InvalidMockTime { value: String, message: String },
}

impl GscError {
    pub fn unknown_unit(unit: impl Into<String>) -> Self {
        Self::UnknownUnit(unit.into())
    }
}

pub type Result<T> = std::result::Result<T, GscError>;
