//! mope Playback Daemon (mope-d) - Main entry point
//!
//! Scans the music root, shuffles it into a playlist and serves the control
//! protocol until told to exit.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mope_common::config::TomlConfig;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mope_d::config::{Config, Overrides};
use mope_d::encoder::StreamEncoder;
use mope_d::playback::{DecoderLauncher, OutputSink, PlaybackController};
use mope_d::server::CommandServer;
use mope_d::{scan, Error, EventLoop, Playlist};

/// Command-line arguments for mope-d
#[derive(Parser, Debug)]
#[command(name = "mope-d")]
#[command(about = "Shuffle-playing music daemon for mope")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MOPE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MOPE_PORT")]
    port: Option<u16>,

    /// Root folder containing music files
    #[arg(short, long, env = "MOPE_MUSIC_ROOT")]
    music_root: Option<PathBuf>,

    /// Config file (default: platform config dir, then /etc/mope)
    #[arg(short, long, env = "MOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mope-d: {:#}", e);
            return ExitCode::from(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mope_d={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting mope-d v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => {
            info!("mope-d stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn load_config(args: Args) -> anyhow::Result<Config> {
    let file = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let overrides = Overrides {
        host: args.host,
        port: args.port,
        music_root: args.music_root,
        log_level: args.log_level,
    };
    Ok(Config::resolve(overrides, file))
}

async fn run(config: Config) -> mope_d::Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Listening on {}", addr);

    info!("Music root: {}", config.music_root.display());
    let songs = scan::load_songs(&config.music_root)?;
    let mut playlist = Playlist::new(songs)?;
    playlist.shuffle();
    info!("Playlist loaded: {} songs", playlist.len());

    let (encoder, sink) = match &config.encoder {
        Some(spec) => {
            let (encoder, writer) = StreamEncoder::start(spec)?;
            (Some(encoder), OutputSink::Pipe(writer))
        }
        None => (None, OutputSink::Inherit),
    };

    let launcher = DecoderLauncher::new(config.decoders.clone(), sink);
    let controller = PlaybackController::new(launcher, config.kill_grace);
    let server = CommandServer::new(config.request_timeout);

    let mut event_loop = EventLoop::new(listener, playlist, controller, server, config.poll_interval);
    if config.autoplay {
        event_loop.autoplay().await;
    }
    event_loop.run(shutdown_signal()).await;

    if let Some(encoder) = encoder {
        encoder.finish(config.request_timeout).await;
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
