//! # mope Common Library
//!
//! Shared code for the playback daemon (`mope-d`) and the control client
//! (`mope`):
//! - Wire protocol (command codes, request framing, response codec)
//! - Configuration file loading and compiled defaults
//! - Common error type

pub mod config;
pub mod error;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::{Command, CommandCode, ProtocolError, Response, ResponseStatus};
