//! Configuration file loading and compiled defaults
//!
//! Values are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 are handled by clap in each binary; this module covers the
//! TOML file and the compiled defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Default daemon port
pub const DEFAULT_PORT: u16 = 14665;

/// Default daemon host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// An external program invocation: the song path (if any) is appended as
/// the final argument
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// `[decoders]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecoderTable {
    /// Invocation for `.ogg` files
    pub ogg: Option<CommandSpec>,
    /// Invocation for everything else
    pub default: Option<CommandSpec>,
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub music_root: Option<PathBuf>,
    pub log_level: Option<String>,
    pub autoplay: Option<bool>,
    pub poll_interval_ms: Option<u64>,
    pub kill_grace_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub decoders: DecoderTable,
    pub encoder: Option<CommandSpec>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the config file
    ///
    /// An explicit path must exist. Without one, the platform locations are
    /// tried and a missing file yields an empty config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    debug!("No config file found, using compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(&path)?;
        Self::parse(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Locate the config file for the platform
///
/// Tries `<user config dir>/mope/config.toml` first, then
/// `/etc/mope/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mope").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/mope/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

/// Compiled fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub music_root: PathBuf,
    pub log_level: String,
    pub autoplay: bool,
    pub poll_interval_ms: u64,
    pub kill_grace_ms: u64,
    pub request_timeout_ms: u64,
    pub ogg_decoder: CommandSpec,
    pub default_decoder: CommandSpec,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            music_root: dirs::audio_dir()
                .or_else(|| dirs::home_dir().map(|d| d.join("Music")))
                .unwrap_or_else(|| PathBuf::from("/var/files/songs")),
            log_level: "info".to_string(),
            autoplay: true,
            poll_interval_ms: 100,
            kill_grace_ms: 20,
            request_timeout_ms: 2000,
            ogg_decoder: CommandSpec::new("ogg123", &["-d", "raw", "-f", "/dev/stdout", "-q"]),
            default_decoder: CommandSpec::new("mpg123", &["-s", "-q"]),
        }
    }
}
