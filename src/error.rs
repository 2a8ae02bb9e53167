use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::types::RunId;

/// Unified error type for the storage engine.
#[derive(Debug)]
pub enum Error {
    /// IO error from disk operations.
    Io(io::Error),
    /// Data corruption detected (CRC mismatch, bad page format).
    Corruption(String),
    /// Rejected engine configuration. Raised before any state is built.
    Config(String),
    /// No buffer slot can accept a write and a flush could not free one.
    CapacityExhausted,
    /// A run was handed to a level that already holds its maximum run count.
    LevelCapacityExceeded { level: usize },
    /// A release named a run that is not a member of the level.
    UnknownRun { level: usize, run: RunId },
    /// Input to a run builder broke its ordering or capacity contract.
    InvalidInput(String),
    /// Another engine already owns the data directory.
    DirectoryLocked(PathBuf),
}

impl Error {
    /// Internal invariant violations point at a sequencing bug in the
    /// merge/cascade path rather than at bad input or a failing disk.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::CapacityExhausted
                | Error::LevelCapacityExceeded { .. }
                | Error::UnknownRun { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Corruption(msg) => write!(f, "Corruption: {msg}"),
            Error::Config(msg) => write!(f, "Invalid configuration: {msg}"),
            Error::CapacityExhausted => write!(f, "Buffer tier capacity exhausted"),
            Error::LevelCapacityExceeded { level } => {
                write!(f, "Disk level {level} is already full")
            }
            Error::UnknownRun { level, run } => {
                write!(f, "Run {run} is not a member of disk level {level}")
            }
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::DirectoryLocked(dir) => {
                write!(f, "Data directory {} is in use by another engine", dir.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Pass `result` through, aborting debug builds on an invariant violation.
/// Release builds return the error to the caller.
pub(crate) fn check_invariant<T>(result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        debug_assert!(!e.is_invariant_violation(), "engine invariant violated: {e}");
    }
    result
}
