//! Command server - decodes one request per connection and applies it
//!
//! Every request is read under a timeout so a stalled client cannot hold
//! the event loop. Malformed requests close the connection with no response
//! and no state change.

use std::fmt::Write as _;
use std::time::Duration;

use mope_common::protocol::{read_command, write_response, Command, Response, ResponseStatus};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::matcher;
use crate::playback::PlaybackController;
use crate::playlist::{Direction, Playlist, Song};

/// Songs listed on each side of the cursor by `List`
pub const LIST_RADIUS: usize = 5;

/// What the event loop does once a request has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// `Exit` was received: the decoder is gone, stop the daemon
    Exit,
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub response: Option<Response>,
    pub outcome: Outcome,
}

impl Dispatch {
    fn silent() -> Self {
        Self {
            response: None,
            outcome: Outcome::Continue,
        }
    }

    fn respond(response: Response) -> Self {
        Self {
            response: Some(response),
            outcome: Outcome::Continue,
        }
    }
}

/// Handles control connections
#[derive(Debug, Clone)]
pub struct CommandServer {
    request_timeout: Duration,
}

impl CommandServer {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Serve one connection: read a request, apply it, answer, close
    pub async fn handle<S>(
        &self,
        mut stream: S,
        playlist: &mut Playlist,
        controller: &mut PlaybackController,
    ) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let command = match timeout(self.request_timeout, read_command(&mut stream)).await {
            Ok(Ok(command)) => command,
            Ok(Err(e)) => {
                debug!("Dropping malformed request: {}", e);
                return Outcome::Continue;
            }
            Err(_) => {
                debug!("Dropping request: client too slow");
                return Outcome::Continue;
            }
        };
        debug!("Received {}", command.code());

        let dispatch = dispatch(command, playlist, controller).await;

        if let Some(response) = &dispatch.response {
            match timeout(self.request_timeout, write_response(&mut stream, response)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Failed to send response: {}", e),
                Err(_) => debug!("Failed to send response: client too slow"),
            }
        }
        if let Err(e) = stream.shutdown().await {
            debug!("Failed to close control connection: {}", e);
        }

        dispatch.outcome
    }
}

/// Apply one command to the playlist and the controller
pub async fn dispatch(
    command: Command,
    playlist: &mut Playlist,
    controller: &mut PlaybackController,
) -> Dispatch {
    match command {
        Command::Pause => {
            controller.toggle_pause();
            Dispatch::silent()
        }
        Command::Stop => {
            controller.stop().await;
            info!("Playback stopped");
            Dispatch::silent()
        }
        Command::Prev => {
            controller.interrupt().await;
            playlist.advance(Direction::Backward);
            Dispatch::silent()
        }
        Command::Next => {
            controller.interrupt().await;
            playlist.advance(Direction::Forward);
            Dispatch::silent()
        }
        Command::Play => {
            controller.play().await;
            Dispatch::silent()
        }
        Command::Jump(query) => {
            match matcher::find(playlist.songs(), playlist.cursor(), &query) {
                Some(index) => {
                    controller.interrupt().await;
                    playlist.set_cursor(index);
                    debug!("Jumped to {}", playlist.current().path().display());
                }
                None => debug!("No song matches {:?}", query),
            }
            Dispatch::silent()
        }
        Command::Title => Dispatch::respond(title_response(playlist, controller)),
        Command::Add(path) => {
            let index = playlist.insert_random(Song::new(path));
            debug!(
                "Added {} at position {}",
                playlist.songs()[index].path().display(),
                index + 1
            );
            Dispatch::silent()
        }
        Command::Exit => {
            controller.shutdown().await;
            info!("Exit requested");
            Dispatch {
                response: None,
                outcome: Outcome::Exit,
            }
        }
        Command::List => Dispatch::respond(list_response(playlist)),
    }
}

/// Current song title; status tells the client whether playback is stopped
pub fn title_response(playlist: &Playlist, controller: &PlaybackController) -> Response {
    let status = if controller.is_stopped() {
        ResponseStatus::Stopped
    } else {
        ResponseStatus::Active
    };
    Response::new(status, format!("{}\n", playlist.current().display_title()))
}

/// Up to [`LIST_RADIUS`] songs either side of the cursor, numbered from 1
pub fn list_response(playlist: &Playlist) -> Response {
    let mut body = String::new();
    for index in playlist.window(LIST_RADIUS) {
        if let Some(song) = playlist.get(index) {
            let _ = writeln!(body, "{}. {}", index + 1, song.display_title());
        } else {
            warn!("List window index {} out of range", index);
        }
    }
    Response::new(ResponseStatus::Active, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{DecoderCommands, DecoderLauncher, OutputSink, PlaybackState};
    use mope_common::config::CommandSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::{Path, PathBuf};

    fn playlist(names: &[&str]) -> Playlist {
        let songs = names.iter().map(|n| Song::from(*n)).collect();
        Playlist::with_rng(songs, StdRng::seed_from_u64(11)).unwrap()
    }

    fn controller() -> PlaybackController {
        let spec = CommandSpec::new("sh", &["-c", "exec sleep 30", "decoder"]);
        let launcher = DecoderLauncher::new(
            DecoderCommands {
                ogg: spec.clone(),
                default: spec,
            },
            OutputSink::Null,
        );
        PlaybackController::new(launcher, Duration::from_millis(20))
    }

    fn numbers(body: &str) -> Vec<usize> {
        body.lines()
            .map(|line| line.split_once(". ").unwrap().0.parse().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_title_while_stopped() {
        let list = playlist(&["/m/a.mp3", "/m/b.mp3"]);
        let controller = controller();

        let response = title_response(&list, &controller);
        assert_eq!(response.status, ResponseStatus::Stopped);
        assert_eq!(response.body, "a\n");
    }

    #[tokio::test]
    async fn test_title_while_playing() {
        let list = playlist(&["/m/a.mp3", "/m/b.mp3"]);
        let mut controller = controller();
        controller.play().await;

        let response = title_response(&list, &controller);
        assert_eq!(response.status, ResponseStatus::Active);
        assert_eq!(response.body, "a\n");
    }

    #[test]
    fn test_list_numbering_and_window() {
        let names: Vec<String> = (1..=30).map(|i| format!("/m/song{i:02}.mp3")).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut list = playlist(&refs);

        let body = list_response(&list).body;
        assert_eq!(numbers(&body), (1..=6).collect::<Vec<_>>());
        assert!(body.starts_with("1. song01\n"));

        list.set_cursor(14);
        let response = list_response(&list);
        assert_eq!(response.status, ResponseStatus::Active);
        assert_eq!(numbers(&response.body), (10..=20).collect::<Vec<_>>());

        list.set_cursor(29);
        assert_eq!(numbers(&list_response(&list).body), (25..=30).collect::<Vec<_>>());
    }

    #[test]
    fn test_list_line_count_bounds() {
        for len in 1..=15 {
            let names: Vec<String> = (0..len).map(|i| format!("/m/{i}.mp3")).collect();
            let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
            let mut list = playlist(&refs);
            for cursor in 0..len {
                list.set_cursor(cursor);
                let lines = numbers(&list_response(&list).body);
                assert!((1..=11).contains(&lines.len()));
                assert!(lines.windows(2).all(|w| w[0] < w[1]));
                assert!(lines.contains(&(cursor + 1)));
            }
        }
    }

    #[tokio::test]
    async fn test_scenario_add_jump_next() {
        let mut list = playlist(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]);
        let mut controller = controller();

        dispatch(Command::Add(PathBuf::from("/m/d.mp3")), &mut list, &mut controller).await;
        assert_eq!(list.len(), 4);
        let added = list.songs().iter().filter(|s| s.path() == Path::new("/m/d.mp3")).count();
        assert_eq!(added, 1);

        dispatch(Command::Jump("b".to_string()), &mut list, &mut controller).await;
        assert_eq!(list.current().path(), Path::new("/m/b.mp3"));
        let at_b = list.cursor();

        dispatch(Command::Next, &mut list, &mut controller).await;
        assert_eq!(list.cursor(), at_b + 1);
        let next = list.current().path().to_path_buf();
        assert!(next == Path::new("/m/c.mp3") || next == Path::new("/m/d.mp3"));
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_jump_without_match_is_noop() {
        let mut list = playlist(&["/m/a.mp3", "/m/b.mp3"]);
        let mut controller = controller();
        controller.play().await;
        controller.start(list.current());
        let pid = controller.decoder_pid();

        let result = dispatch(Command::Jump("zzz".to_string()), &mut list, &mut controller).await;
        assert_eq!(result, Dispatch::silent());
        assert_eq!(list.cursor(), 0);
        assert_eq!(controller.decoder_pid(), pid);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_jump_while_paused_restarts_playing() {
        let mut list = playlist(&["/m/a.mp3", "/m/b.mp3"]);
        let mut controller = controller();
        controller.play().await;
        controller.start(list.current());
        controller.toggle_pause();

        dispatch(Command::Jump("B.MP3".to_string()), &mut list, &mut controller).await;
        assert_eq!(list.cursor(), 1);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert!(controller.needs_decoder());
        assert!(!controller.natural_advance());
    }

    #[tokio::test]
    async fn test_prev_from_head_reshuffles() {
        let mut list = playlist(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]);
        let mut controller = controller();

        dispatch(Command::Prev, &mut list, &mut controller).await;
        assert_eq!(list.cursor(), 0);
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn test_exit_kills_decoder() {
        let mut list = playlist(&["/m/a.mp3"]);
        let mut controller = controller();
        controller.play().await;
        controller.start(list.current());

        let result = dispatch(Command::Exit, &mut list, &mut controller).await;
        assert_eq!(result.outcome, Outcome::Exit);
        assert!(result.response.is_none());
        assert!(!controller.has_decoder());
    }

    #[tokio::test]
    async fn test_handle_writes_title_response() {
        let mut list = playlist(&["/m/Song.mp3"]);
        let mut controller = controller();
        let server = CommandServer::new(Duration::from_secs(1));

        let (mut client, daemon_side) = tokio::io::duplex(1024);
        client.write_all(&Command::Title.encode().unwrap()).await.unwrap();

        let outcome = server.handle(daemon_side, &mut list, &mut controller).await;
        assert_eq!(outcome, Outcome::Continue);

        let response = mope_common::protocol::read_response(&mut client).await.unwrap();
        assert_eq!(response, Some(Response::new(ResponseStatus::Stopped, "Song\n")));
    }

    #[tokio::test]
    async fn test_handle_drops_oversized_add() {
        let mut list = playlist(&["/m/a.mp3"]);
        let mut controller = controller();
        let server = CommandServer::new(Duration::from_secs(1));

        let (mut client, daemon_side) = tokio::io::duplex(4096);
        let mut frame = vec![7u8];
        frame.extend_from_slice(&300i32.to_ne_bytes());
        frame.extend_from_slice(&[b'x'; 300]);
        client.write_all(&frame).await.unwrap();

        server.handle(daemon_side, &mut list, &mut controller).await;
        assert_eq!(list.len(), 1);

        let response = mope_common::protocol::read_response(&mut client).await.unwrap();
        assert_eq!(response, None);
    }

    #[tokio::test]
    async fn test_handle_add_keeps_path_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let mut list = playlist(&["/m/a.mp3"]);
        let mut controller = controller();
        let server = CommandServer::new(Duration::from_secs(1));

        let raw: &[u8] = b"/m/caf\xe9.mp3";
        let (mut client, daemon_side) = tokio::io::duplex(1024);
        let mut frame = vec![7u8];
        frame.extend_from_slice(&(raw.len() as i32).to_ne_bytes());
        frame.extend_from_slice(raw);
        client.write_all(&frame).await.unwrap();

        server.handle(daemon_side, &mut list, &mut controller).await;
        assert_eq!(list.len(), 2);
        assert!(list.songs().iter().any(|s| s.path().as_os_str().as_bytes() == raw));
    }

    #[tokio::test]
    async fn test_handle_times_out_silent_client() {
        let mut list = playlist(&["/m/a.mp3"]);
        let mut controller = controller();
        let server = CommandServer::new(Duration::from_millis(50));

        let (_client, daemon_side) = tokio::io::duplex(64);
        let outcome = server.handle(daemon_side, &mut list, &mut controller).await;
        assert_eq!(outcome, Outcome::Continue);
    }
}
