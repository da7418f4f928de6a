//! Playback controller - owns the decoder and the play/pause/stop state
//!
//! **Responsibilities:**
//! - Keep at most one decoder process alive, matching [`PlaybackState`]
//! - Resume-before-terminate kill discipline
//! - Tell a track that finished on its own apart from one cut short by a
//!   command (`natural_advance`)
//!
//! The controller never touches the playlist. Commands that move the cursor
//! interrupt the decoder here and the event loop starts the next one.

use std::process::ExitStatus;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::decoder::{DecoderLauncher, DecoderProcess};
use super::state::PlaybackState;
use crate::playlist::Song;

/// How the owned decoder's exit should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    /// The track played to the end: advance the cursor
    Finished,
    /// A command already decided what comes next
    Interrupted,
}

#[derive(Debug)]
enum DecoderSlot {
    Running(DecoderProcess),
    /// The decoder program could not be started; treated as a track that
    /// ended immediately
    LaunchFailed,
}

/// Playback state machine over one owned decoder
#[derive(Debug)]
pub struct PlaybackController {
    launcher: DecoderLauncher,
    slot: Option<DecoderSlot>,
    state: PlaybackState,
    natural_advance: bool,
    kill_grace: Duration,
}

impl PlaybackController {
    pub fn new(launcher: DecoderLauncher, kill_grace: Duration) -> Self {
        Self {
            launcher,
            slot: None,
            state: PlaybackState::Stopped,
            natural_advance: false,
            kill_grace,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    pub fn natural_advance(&self) -> bool {
        self.natural_advance
    }

    pub fn has_decoder(&self) -> bool {
        self.slot.is_some()
    }

    /// Pid of the running decoder, if any
    pub fn decoder_pid(&self) -> Option<u32> {
        match &self.slot {
            Some(DecoderSlot::Running(process)) => process.id(),
            _ => None,
        }
    }

    /// Whether playback is on but no decoder occupies the slot
    pub fn needs_decoder(&self) -> bool {
        !self.is_stopped() && self.slot.is_none()
    }

    /// Start a decoder for `song` in the free slot
    ///
    /// A launch failure is logged and recorded as a decoder that exited at
    /// once, so the track is skipped through the normal end-of-track path.
    pub fn start(&mut self, song: &Song) {
        if self.slot.is_some() {
            warn!("Decoder slot busy, not starting {}", song.path().display());
            return;
        }

        self.slot = Some(match self.launcher.launch(song) {
            Ok(process) => {
                info!("Playing: {}", song.display_title());
                DecoderSlot::Running(process)
            }
            Err(e) => {
                warn!("Cannot start decoder for {}: {}", song.path().display(), e);
                DecoderSlot::LaunchFailed
            }
        });
        self.state = PlaybackState::Playing;
        self.natural_advance = true;
    }

    /// Start playback, or restart the current track
    pub async fn play(&mut self) {
        if !self.is_stopped() {
            self.kill().await;
        }
        self.natural_advance = false;
        self.state = PlaybackState::Playing;
    }

    /// Suspend a playing decoder or resume a paused one
    ///
    /// Ignored unless a decoder is actually running: a track whose decoder
    /// failed to launch is about to be skipped, and the next one starts
    /// `Playing`.
    pub fn toggle_pause(&mut self) {
        let Some(DecoderSlot::Running(process)) = &self.slot else {
            debug!("No running decoder, ignoring pause");
            return;
        };
        self.state = match self.state {
            PlaybackState::Stopped => return,
            PlaybackState::Playing => {
                process.suspend();
                PlaybackState::Paused
            }
            PlaybackState::Paused => {
                process.resume();
                PlaybackState::Playing
            }
        };
        debug!("Playback {}", self.state);
    }

    /// Kill the decoder and stay stopped
    pub async fn stop(&mut self) {
        if self.is_stopped() {
            return;
        }
        self.kill().await;
        self.natural_advance = false;
        self.state = PlaybackState::Stopped;
    }

    /// Cut the current track short because the cursor is about to move
    ///
    /// When stopped this does nothing; otherwise the decoder is killed and
    /// the controller is left `Playing` with a free slot, so the event loop
    /// starts the song under the new cursor.
    pub async fn interrupt(&mut self) {
        if self.is_stopped() {
            return;
        }
        self.kill().await;
        self.natural_advance = false;
        self.state = PlaybackState::Playing;
    }

    /// Terminate any owned decoder before the daemon exits
    pub async fn shutdown(&mut self) {
        if self.slot.is_none() {
            return;
        }
        self.kill().await;
        self.natural_advance = false;
        self.state = PlaybackState::Stopped;
    }

    /// Wait for the owned decoder to exit
    ///
    /// Never resolves while the slot is empty. A failed launch resolves with
    /// no status once the kill grace interval has passed.
    pub async fn wait_exit(&mut self) -> Option<ExitStatus> {
        match self.slot.as_mut() {
            Some(DecoderSlot::Running(process)) => match process.wait().await {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("Failed to wait for decoder: {}", e);
                    None
                }
            },
            Some(DecoderSlot::LaunchFailed) => {
                tokio::time::sleep(self.kill_grace).await;
                None
            }
            None => std::future::pending().await,
        }
    }

    /// Clear the slot after [`wait_exit`](Self::wait_exit) resolved
    pub fn reap(&mut self) -> TrackEnd {
        self.slot = None;
        if std::mem::take(&mut self.natural_advance) {
            TrackEnd::Finished
        } else {
            TrackEnd::Interrupted
        }
    }

    /// Send SIGTERM, plus SIGCONT when suspended so the signal is acted on,
    /// then free the slot after the grace interval
    async fn kill(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        let DecoderSlot::Running(mut process) = slot else {
            return;
        };

        process.terminate();
        if self.state == PlaybackState::Paused {
            process.resume();
        }
        tokio::time::sleep(self.kill_grace).await;

        match process.try_wait() {
            Ok(Some(status)) => debug!("Decoder exited: {}", status),
            Ok(None) => {
                debug!("Decoder still running after grace interval, reaping in background");
                process.detach();
            }
            Err(e) => warn!("Failed to check decoder status: {}", e),
        }
    }
}
