//! Decoder subprocesses
//!
//! A decoder is an external program that turns one file into a raw audio
//! stream on its standard output. The song path is always its final
//! argument. Pausing, resuming and terminating are done with job control
//! signals, so the decoder needs no cooperation beyond dying on SIGTERM.

use std::io;
use std::io::PipeWriter;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use mope_common::config::CommandSpec;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::playlist::Song;

/// Decoder invocations by file type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderCommands {
    /// Used for `.ogg` files (any case)
    pub ogg: CommandSpec,
    /// Used for everything else
    pub default: CommandSpec,
}

impl DecoderCommands {
    pub fn for_path(&self, path: &Path) -> &CommandSpec {
        let is_ogg = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("ogg"))
            .unwrap_or(false);
        if is_ogg {
            &self.ogg
        } else {
            &self.default
        }
    }
}

/// Where decoders write their audio
#[derive(Debug)]
pub enum OutputSink {
    /// The daemon's own standard output
    Inherit,
    /// Discarded
    Null,
    /// Write end of the pipe feeding the streaming encoder
    Pipe(PipeWriter),
}

impl OutputSink {
    fn stdio(&self) -> io::Result<Stdio> {
        Ok(match self {
            OutputSink::Inherit => Stdio::inherit(),
            OutputSink::Null => Stdio::null(),
            OutputSink::Pipe(writer) => Stdio::from(writer.try_clone()?),
        })
    }
}

/// Spawns decoder processes
#[derive(Debug)]
pub struct DecoderLauncher {
    commands: DecoderCommands,
    sink: OutputSink,
}

impl DecoderLauncher {
    pub fn new(commands: DecoderCommands, sink: OutputSink) -> Self {
        Self { commands, sink }
    }

    /// Start a decoder for `song`
    pub fn launch(&self, song: &Song) -> io::Result<DecoderProcess> {
        let spec = self.commands.for_path(song.path());
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .arg(song.path())
            .stdin(Stdio::null())
            .stdout(self.sink.stdio()?)
            .stderr(Stdio::null())
            .spawn()?;

        let pid = child.id().map(|id| Pid::from_raw(id as i32));
        debug!(
            program = %spec.program,
            pid = ?pid,
            "Decoder started for {}",
            song.path().display()
        );

        Ok(DecoderProcess { child, pid })
    }
}

/// A running decoder, exclusively owned by the playback controller
#[derive(Debug)]
pub struct DecoderProcess {
    child: Child,
    /// Cleared once the process has been reaped, so a recycled pid is
    /// never signalled
    pid: Option<Pid>,
}

impl DecoderProcess {
    pub fn id(&self) -> Option<u32> {
        self.pid.map(|pid| pid.as_raw() as u32)
    }

    /// Stop execution without killing (SIGSTOP)
    pub fn suspend(&self) {
        self.signal(Signal::SIGSTOP);
    }

    /// Continue a suspended decoder (SIGCONT)
    pub fn resume(&self) {
        self.signal(Signal::SIGCONT);
    }

    /// Ask the decoder to exit (SIGTERM)
    ///
    /// A suspended decoder only acts on this after [`resume`](Self::resume).
    pub fn terminate(&self) {
        self.signal(Signal::SIGTERM);
    }

    fn signal(&self, signal: Signal) {
        let Some(pid) = self.pid else {
            return;
        };
        if let Err(e) = kill(pid, signal) {
            // The decoder may already be gone; its exit is picked up by wait()
            debug!("Failed to send {} to decoder {}: {}", signal, pid, e);
        }
    }

    /// Wait for the decoder to exit
    ///
    /// Cancel safe, so it can sit in a `select!` next to the listener.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.pid = None;
        Ok(status)
    }

    /// Reap the decoder if it has already exited
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.pid = None;
        }
        Ok(status)
    }

    /// Hand a terminated decoder to a background task that reaps it
    pub fn detach(mut self) {
        tokio::spawn(async move {
            match self.child.wait().await {
                Ok(status) => debug!("Detached decoder exited: {}", status),
                Err(e) => warn!("Failed to reap detached decoder: {}", e),
            }
        });
    }
}
