//! Action flag parsing
//!
//! The first word selects the command. Leading dashes are optional, so `j`,
//! `-j` and `--j` are the same flag.

use std::ffi::OsString;
use std::path::PathBuf;

use mope_common::protocol::Command;
use thiserror::Error;

pub const USAGE: &str = "\
usage: mope [--host HOST] [--port PORT] [--config FILE] <flag> [args...]
  u          pause or resume
  s          stop
  r          previous song
  f          next song
  p          play (restarts the current song)
  j WORDS    jump to the next song whose path contains every word
  t          show the current title
  T          show the current title even when stopped
  a PATH     add a file to the playlist
  x          shut the daemon down
  l          list songs around the current one
  h          show this help
";

/// What the client was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Send {
        command: Command,
        /// Print the response body even when playback is stopped
        force: bool,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("no flag given")]
    MissingFlag,

    #[error("unknown option {0}")]
    UnknownOption(String),

    #[error("j needs at least one word to search for")]
    MissingQuery,

    #[error("a needs a path")]
    MissingPath,
}

/// Parse the flag and its arguments
///
/// Words arrive as raw OS strings so an `a` path that is not UTF-8 is sent
/// unchanged.
pub fn parse_action(words: &[OsString]) -> Result<Action, UsageError> {
    let (flag, rest) = words.split_first().ok_or(UsageError::MissingFlag)?;

    let send = |command| Action::Send {
        command,
        force: false,
    };

    let flag = flag.to_string_lossy();
    let action = match flag.trim_start_matches('-') {
        "u" => send(Command::Pause),
        "s" => send(Command::Stop),
        "r" => send(Command::Prev),
        "f" => send(Command::Next),
        "p" => send(Command::Play),
        "j" => {
            if rest.is_empty() {
                return Err(UsageError::MissingQuery);
            }
            let query: Vec<_> = rest.iter().map(|word| word.to_string_lossy()).collect();
            send(Command::Jump(query.join(" ")))
        }
        "t" => send(Command::Title),
        "T" => Action::Send {
            command: Command::Title,
            force: true,
        },
        "a" => match rest.first() {
            Some(path) => send(Command::Add(PathBuf::from(path))),
            None => return Err(UsageError::MissingPath),
        },
        "x" => send(Command::Exit),
        "l" => send(Command::List),
        "h" => Action::Help,
        other => return Err(UsageError::UnknownOption(other.to_string())),
    };
    Ok(action)
}
