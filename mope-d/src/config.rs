//! mope-d specific configuration
//!
//! Merges command-line/environment overrides, the TOML file and the compiled
//! defaults into one resolved [`Config`].

use std::path::PathBuf;
use std::time::Duration;

use mope_common::config::{CommandSpec, CompiledDefaults, TomlConfig};

use crate::playback::DecoderCommands;

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub music_root: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Playback daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub music_root: PathBuf,
    pub log_level: String,
    /// Start playing as soon as the daemon is up
    pub autoplay: bool,
    /// Upper bound on how long a finished track goes unnoticed
    pub poll_interval: Duration,
    /// Pause after terminating a decoder before the slot is reused
    pub kill_grace: Duration,
    /// Deadline for reading a request and writing its response
    pub request_timeout: Duration,
    pub decoders: DecoderCommands,
    pub encoder: Option<CommandSpec>,
}

impl Config {
    /// Resolve each value: override, then file, then compiled default
    pub fn resolve(overrides: Overrides, file: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            host: overrides.host.or(file.host).unwrap_or(defaults.host),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            music_root: overrides
                .music_root
                .or(file.music_root)
                .unwrap_or(defaults.music_root),
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            autoplay: file.autoplay.unwrap_or(defaults.autoplay),
            poll_interval: Duration::from_millis(
                file.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
            ),
            kill_grace: Duration::from_millis(file.kill_grace_ms.unwrap_or(defaults.kill_grace_ms)),
            request_timeout: Duration::from_millis(
                file.request_timeout_ms.unwrap_or(defaults.request_timeout_ms),
            ),
            decoders: DecoderCommands {
                ogg: file.decoders.ogg.unwrap_or(defaults.ogg_decoder),
                default: file.decoders.default.unwrap_or(defaults.default_decoder),
            },
            encoder: file.encoder,
        }
    }

    /// `host:port` for the listening socket
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
