//! Data logger error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Logged by the logger loop and turned into an idle state, never returned
/// across the bus.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to prepare log directory '{}': {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log sequence in '{}' is exhausted at {max}", .dir.display())]
    SequenceExhausted { dir: PathBuf, max: u32 },

    #[error("failed to open log file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write log file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoggerError {
    pub fn directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    pub fn sequence_exhausted(dir: impl Into<PathBuf>, max: u32) -> Self {
        Self::SequenceExhausted {
            dir: dir.into(),
            max,
        }
    }

    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Metric label for the failing stage
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Directory { .. } => "directory",
            Self::SequenceExhausted { .. } => "sequence",
            Self::Open { .. } => "open",
            Self::Write { .. } => "write",
        }
    }
}

pub type Result<T> = std::result::Result<T, LoggerError>;
