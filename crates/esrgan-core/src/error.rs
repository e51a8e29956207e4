//! Error types for esrgan-core.

use std::path::PathBuf;
use thiserror::Error;

/// Error type shared by every esrgan crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid '{param}': {reason}")]
    InvalidConfig { param: &'static str, reason: String },

    #[error("invalid device id {id} ({count} device(s) available)")]
    InvalidDevice { id: u32, count: u32 },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("can't open model file {}: {source}", path.display())]
    ModelFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("device {id} unavailable: {reason}")]
    DeviceUnavailable { id: u32, reason: String },

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("frame geometry mismatch: {0}")]
    FrameGeometry(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("model output has the wrong shape: {0}")]
    ModelOutput(String),

    #[error("device readback failed: {0}")]
    Readback(String),

    #[error("device failed while processing: {0}")]
    DeviceFault(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by callers that only care about who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user-supplied option. Fatal to the creation attempt only.
    Configuration,
    /// Missing model files or unusable device.
    Resource,
    /// Failure while a session is processing frames.
    Processing,
}

impl Error {
    pub(crate) fn config(param: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            param,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig { .. } | Error::InvalidDevice { .. } | Error::ConfigParse(_) => {
                ErrorKind::Configuration
            }
            Error::ModelFile { .. }
            | Error::DeviceUnavailable { .. }
            | Error::ModelLoad(_)
            | Error::Io(_) => ErrorKind::Resource,
            Error::FrameGeometry(_)
            | Error::SessionClosed
            | Error::ModelOutput(_)
            | Error::Readback(_)
            | Error::DeviceFault(_) => ErrorKind::Processing,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
