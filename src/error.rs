//! Error type for the esrgan umbrella crate.
//!
//! Wraps the core error so `?` propagates naturally in binaries and callers
//! that also do their own I/O.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] esrgan_core::Error),

    #[error("no GPU device available")]
    NoDevice,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classification of the underlying core error, if there is one.
    pub fn kind(&self) -> Option<esrgan_core::ErrorKind> {
        match self {
            Error::Core(e) => Some(e.kind()),
            Error::NoDevice => Some(esrgan_core::ErrorKind::Resource),
            Error::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
