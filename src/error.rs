//! Errors returned by timer operations

use std::io;
use thiserror::Error;

/// The ways a timer operation can fail.
///
/// Nothing is retried internally; callers decide whether to retry, log
/// or escalate.
#[derive(Debug, Error)]
pub enum TimerError {
    /// The operation was handed something it cannot act on, e.g. a timer
    /// whose facility handle has already been released.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The underlying facility failed to create, arm, disarm or release
    /// the timer resource.
    #[error("timer resource error: {0}")]
    Resource(#[from] io::Error),
}

impl TimerError {
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            TimerError::InvalidArgument(_) => true,
            TimerError::Resource(_) => false,
        }
    }

    pub fn is_resource(&self) -> bool {
        !self.is_invalid_argument()
    }
}
