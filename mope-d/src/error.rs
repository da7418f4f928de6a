//! Error types for mope-d
//!
//! Only startup can fail fatally. Everything that goes wrong once the event
//! loop is running is logged and absorbed.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for mope-d
#[derive(Error, Debug)]
pub enum Error {
    /// Listening socket could not be created or bound
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Music root scan produced no songs
    #[error("No songs found under {0}")]
    EmptyPlaylist(PathBuf),

    /// Streaming encoder could not be started
    #[error("Encoder error: {0}")]
    Encoder(String),
}

impl Error {
    /// Process exit status for a fatal startup error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::EmptyPlaylist(_) => 2,
            _ => 1,
        }
    }
}

/// Convenience Result type using mope-d Error
pub type Result<T> = std::result::Result<T, Error>;
