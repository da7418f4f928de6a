//! Optional streaming encoder
//!
//! Started once at boot with the read end of a pipe as its standard input.
//! Every decoder gets a copy of the write end as its standard output, so the
//! encoder sees one continuous stream across track changes. The encoder is
//! not restarted per track and is not owned by the playback controller.

use std::io::PipeWriter;
use std::process::Stdio;
use std::time::Duration;

use mope_common::config::CommandSpec;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{Error, Result};

/// Running encoder process
#[derive(Debug)]
pub struct StreamEncoder {
    child: Child,
}

impl StreamEncoder {
    /// Start the encoder and return the write end of its input pipe
    pub fn start(spec: &CommandSpec) -> Result<(Self, PipeWriter)> {
        let (reader, writer) = std::io::pipe()
            .map_err(|e| Error::Encoder(format!("cannot create pipe: {}", e)))?;

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::from(reader))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Encoder(format!("cannot start {}: {}", spec.program, e)))?;

        info!("Streaming encoder started: {} (pid {:?})", spec.program, child.id());
        Ok((Self { child }, writer))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the encoder to drain its input and exit
    ///
    /// Every copy of the pipe's write end must already be closed. An encoder
    /// still running after `grace` is killed.
    pub async fn finish(mut self, grace: Duration) {
        match timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => info!("Streaming encoder exited: {}", status),
            Ok(Err(e)) => warn!("Failed to wait for streaming encoder: {}", e),
            Err(_) => {
                warn!("Streaming encoder still running, killing it");
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill streaming encoder: {}", e);
                }
            }
        }
    }
}
