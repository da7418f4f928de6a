//! Playback state machine and decoder process control

pub mod controller;
pub mod decoder;
pub mod state;

pub use controller::{PlaybackController, TrackEnd};
pub use decoder::{DecoderCommands, DecoderLauncher, DecoderProcess, OutputSink};
pub use state::PlaybackState;
