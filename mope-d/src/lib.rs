//! # mope Playback Daemon Library (mope-d)
//!
//! Holds a shuffled playlist, drives exactly one external decoder process at
//! a time, and accepts one-shot control requests over TCP.
//!
//! **Architecture:** a single control task multiplexes "control connection
//! ready", "decoder exited" and "shutdown requested" into one ordered stream
//! of transitions. No state is shared between tasks, so nothing is locked.

pub mod config;
pub mod encoder;
pub mod error;
pub mod event_loop;
pub mod matcher;
pub mod playback;
pub mod playlist;
pub mod scan;
pub mod server;

pub use error::{Error, Result};
pub use event_loop::EventLoop;
pub use playlist::{Direction, Playlist, Song};
