//! The crate-wide error type.
//!
//! Mirrors the reference server's split: I/O failures that bubble up from the
//! connection engine, and fatal startup failures that should abort the process
//! rather than be handled.

use std::{fmt, io};

pub type SkyResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An I/O error while talking to a peer or the OS
    Io(io::Error),
    /// Failed to bind the listening socket
    Bind(io::Error),
    /// Any other condition that should abort the process
    Fatal(String),
}

impl Error {
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Bind(e) => write!(f, "failed to bind listening socket: {e}"),
            Self::Fatal(msg) => write!(f, "fatal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
