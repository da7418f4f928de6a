//! Control protocol spoken between `mope` and `mope-d`
//!
//! One TCP connection carries exactly one request and, for `Title` and
//! `List`, one response.
//!
//! Request layout:
//!
//! | offset | field          | encoding                                  |
//! |--------|----------------|-------------------------------------------|
//! | 0      | command code   | 1 byte, 0-9                               |
//! | 1      | payload length | 4 bytes, native byte order, `Jump`/`Add`  |
//! | 5..    | payload        | raw bytes, at most [`MAX_PAYLOAD_LEN`]    |
//!
//! Response layout: one status byte followed by raw text. The server closing
//! the connection terminates the response; there is no length field.

use std::ffi::OsString;
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload a `Jump` or `Add` request may declare
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Protocol errors
///
/// The daemon answers every one of these by closing the connection without a
/// response and without touching playback state.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Command byte outside 0-9
    #[error("Unknown command code: {0}")]
    UnknownCommand(u8),

    /// Declared payload length is negative or exceeds the bound
    #[error("Payload length {0} outside 0..=256")]
    BadLength(i64),

    /// Payload is empty once trailing NUL bytes are stripped
    #[error("Empty payload for {0}")]
    EmptyPayload(CommandCode),

    /// Connection failed or ended before the declared bytes arrived
    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),
}

/// Numeric command codes as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    Pause = 0,
    Stop = 1,
    Prev = 2,
    Next = 3,
    Play = 4,
    Jump = 5,
    Title = 6,
    Add = 7,
    Exit = 8,
    List = 9,
}

impl CommandCode {
    /// Whether the server writes a response before closing
    pub fn has_response(self) -> bool {
        matches!(self, CommandCode::Title | CommandCode::List)
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => CommandCode::Pause,
            1 => CommandCode::Stop,
            2 => CommandCode::Prev,
            3 => CommandCode::Next,
            4 => CommandCode::Play,
            5 => CommandCode::Jump,
            6 => CommandCode::Title,
            7 => CommandCode::Add,
            8 => CommandCode::Exit,
            9 => CommandCode::List,
            other => return Err(ProtocolError::UnknownCommand(other)),
        })
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandCode::Pause => "pause",
            CommandCode::Stop => "stop",
            CommandCode::Prev => "prev",
            CommandCode::Next => "next",
            CommandCode::Play => "play",
            CommandCode::Jump => "jump",
            CommandCode::Title => "title",
            CommandCode::Add => "add",
            CommandCode::Exit => "exit",
            CommandCode::List => "list",
        };
        f.write_str(name)
    }
}

/// A decoded control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Toggle pause/resume
    Pause,
    Stop,
    Prev,
    Next,
    /// Start playback, or restart the current track
    Play,
    /// Move the cursor to the first song matching the query words
    Jump(String),
    /// Report the current song title
    Title,
    /// Insert a song path at a random playlist position
    ///
    /// The path travels as raw bytes, so names that are not UTF-8 survive.
    Add(PathBuf),
    /// Stop playback and terminate the daemon
    Exit,
    /// Report the songs around the cursor
    List,
}

impl Command {
    pub fn code(&self) -> CommandCode {
        match self {
            Command::Pause => CommandCode::Pause,
            Command::Stop => CommandCode::Stop,
            Command::Prev => CommandCode::Prev,
            Command::Next => CommandCode::Next,
            Command::Play => CommandCode::Play,
            Command::Jump(_) => CommandCode::Jump,
            Command::Title => CommandCode::Title,
            Command::Add(_) => CommandCode::Add,
            Command::Exit => CommandCode::Exit,
            Command::List => CommandCode::List,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Command::Jump(text) => Some(text.as_bytes()),
            Command::Add(path) => Some(path.as_os_str().as_bytes()),
            _ => None,
        }
    }

    /// Encode the request exactly as it travels on the wire
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut frame = vec![self.code() as u8];
        if let Some(bytes) = self.payload() {
            if bytes.is_empty() {
                return Err(ProtocolError::EmptyPayload(self.code()));
            }
            if bytes.len() > MAX_PAYLOAD_LEN {
                return Err(ProtocolError::BadLength(bytes.len() as i64));
            }
            frame.extend_from_slice(&(bytes.len() as i32).to_ne_bytes());
            frame.extend_from_slice(bytes);
        }
        Ok(frame)
    }
}

/// Read and validate one request from a control connection
pub async fn read_command<R>(reader: &mut R) -> Result<Command, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let code = CommandCode::try_from(reader.read_u8().await?)?;
    let command = match code {
        CommandCode::Pause => Command::Pause,
        CommandCode::Stop => Command::Stop,
        CommandCode::Prev => Command::Prev,
        CommandCode::Next => Command::Next,
        CommandCode::Play => Command::Play,
        CommandCode::Title => Command::Title,
        CommandCode::Exit => Command::Exit,
        CommandCode::List => Command::List,
        CommandCode::Jump => {
            let query = read_payload(reader, code).await?;
            Command::Jump(String::from_utf8_lossy(&query).into_owned())
        }
        CommandCode::Add => {
            let path = read_payload(reader, code).await?;
            Command::Add(PathBuf::from(OsString::from_vec(path)))
        }
    };
    Ok(command)
}

async fn read_payload<R>(reader: &mut R, code: CommandCode) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let declared = i32::from_ne_bytes(header);
    if declared < 0 || declared as usize > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::BadLength(declared as i64));
    }

    let mut payload = vec![0u8; declared as usize];
    reader.read_exact(&mut payload).await?;

    // Older clients include the string terminator in the declared length
    while payload.last() == Some(&0) {
        payload.pop();
    }
    if payload.is_empty() {
        return Err(ProtocolError::EmptyPayload(code));
    }
    Ok(payload)
}

/// Write one request
pub async fn write_command<W>(writer: &mut W, command: &Command) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = command.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Leading status byte of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Playback is stopped; clients hide the body unless forced
    Stopped = 0,
    Active = 1,
}

impl From<u8> for ResponseStatus {
    fn from(byte: u8) -> Self {
        if byte == 0 {
            ResponseStatus::Stopped
        } else {
            ResponseStatus::Active
        }
    }
}

/// Response to `Title` or `List`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub body: String,
}

impl Response {
    pub fn new(status: ResponseStatus, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Write a response; the caller closes the connection afterwards
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(response.status as u8).await?;
    writer.write_all(response.body.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a response until the server closes the connection
///
/// Returns `None` if the connection closed before the status byte.
pub async fn read_response<R>(reader: &mut R) -> Result<Option<Response>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).await?;
    let Some((&status, body)) = raw.split_first() else {
        return Ok(None);
    };
    Ok(Some(Response::new(
        ResponseStatus::from(status),
        String::from_utf8_lossy(body),
    )))
}
