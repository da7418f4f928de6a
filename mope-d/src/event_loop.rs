//! Event loop - the single control task of the daemon
//!
//! Each iteration waits for the first of:
//! - a new control connection
//! - the owned decoder exiting
//! - a shutdown request
//!
//! While stopped the wait is unbounded. While playing or paused it is capped
//! at the poll interval, which bounds how long a finished track can go
//! unnoticed.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::playback::{PlaybackController, TrackEnd};
use crate::playlist::{Direction, Playlist};
use crate::server::{CommandServer, Outcome};

enum LoopEvent {
    Shutdown,
    Connection(io::Result<(TcpStream, SocketAddr)>),
    DecoderExited(Option<ExitStatus>),
    /// Poll interval elapsed with nothing to do
    Idle,
}

/// Owns every piece of daemon state; nothing is shared, nothing is locked
pub struct EventLoop {
    listener: TcpListener,
    playlist: Playlist,
    controller: PlaybackController,
    server: CommandServer,
    poll_interval: Duration,
}

impl EventLoop {
    pub fn new(
        listener: TcpListener,
        playlist: Playlist,
        controller: PlaybackController,
        server: CommandServer,
        poll_interval: Duration,
    ) -> Self {
        Self {
            listener,
            playlist,
            controller,
            server,
            poll_interval,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Switch playback on before the loop starts
    pub async fn autoplay(&mut self) {
        self.controller.play().await;
    }

    /// Run until `Exit` is received or `shutdown` resolves
    ///
    /// Any decoder still owned on the way out is resumed and terminated.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            if self.controller.needs_decoder() {
                self.controller.start(self.playlist.current());
            }

            match self.next_event(&mut shutdown).await {
                LoopEvent::Shutdown => {
                    info!("Shutdown requested");
                    self.controller.shutdown().await;
                    break;
                }
                LoopEvent::Connection(Ok((stream, peer))) => {
                    debug!(%peer, "Control connection");
                    let outcome = self
                        .server
                        .handle(stream, &mut self.playlist, &mut self.controller)
                        .await;
                    if outcome == Outcome::Exit {
                        break;
                    }
                }
                LoopEvent::Connection(Err(e)) => {
                    warn!("Failed to accept control connection: {}", e);
                    tokio::time::sleep(self.poll_interval).await;
                }
                LoopEvent::DecoderExited(status) => {
                    debug!("Decoder exited: {:?}", status);
                    if self.controller.reap() == TrackEnd::Finished {
                        self.playlist.advance(Direction::Forward);
                    }
                }
                LoopEvent::Idle => {}
            }
        }

        info!("Event loop stopped");
    }

    async fn next_event<F>(&mut self, shutdown: &mut Pin<&mut F>) -> LoopEvent
    where
        F: Future<Output = ()>,
    {
        let bounded = !self.controller.is_stopped();
        let poll_interval = self.poll_interval;
        let listener = &self.listener;
        let controller = &mut self.controller;

        let wait = async {
            tokio::select! {
                _ = shutdown.as_mut() => LoopEvent::Shutdown,
                accepted = listener.accept() => LoopEvent::Connection(accepted),
                status = controller.wait_exit() => LoopEvent::DecoderExited(status),
            }
        };

        if bounded {
            timeout(poll_interval, wait).await.unwrap_or(LoopEvent::Idle)
        } else {
            wait.await
        }
    }
}
