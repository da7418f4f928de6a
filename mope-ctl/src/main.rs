//! mope control client - sends one command to the playback daemon
//!
//! Title and list responses are streamed to standard output until the
//! daemon closes the connection. A daemon that cannot be reached is logged
//! and otherwise ignored.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mope_common::config::{CompiledDefaults, TomlConfig};
use mope_common::protocol::{write_command, Command, ResponseStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod action;

use action::{parse_action, Action, USAGE};

/// Command-line arguments for mope
#[derive(Parser, Debug)]
#[command(name = "mope")]
#[command(about = "Control client for the mope playback daemon")]
#[command(version)]
#[command(disable_help_flag = true)]
struct Args {
    /// Daemon address
    #[arg(long, env = "MOPE_HOST")]
    host: Option<String>,

    /// Daemon port
    #[arg(long, env = "MOPE_PORT")]
    port: Option<u16>,

    /// Config file shared with the daemon
    #[arg(long, env = "MOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Command flag followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<OsString>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let (command, force) = match parse_action(&args.words) {
        Ok(Action::Help) => {
            print!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(Action::Send { command, force }) => (command, force),
        Err(e) => {
            eprintln!("mope: {}", e);
            eprint!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let addr = match daemon_addr(&args) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("mope: {:#}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = send(&addr, &command, force).await {
        warn!("{:#}", e);
    }
    ExitCode::SUCCESS
}

/// `host:port` of the daemon: flag or environment, then config file, then default
fn daemon_addr(args: &Args) -> anyhow::Result<String> {
    let file = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let defaults = CompiledDefaults::for_current_platform();
    let host = args
        .host
        .clone()
        .or(file.host)
        .unwrap_or(defaults.host);
    let port = args.port.or(file.port).unwrap_or(defaults.port);
    Ok(format!("{}:{}", host, port))
}

async fn send(addr: &str, command: &Command, force: bool) -> anyhow::Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Cannot reach mope-d at {}", addr))?;
    write_command(&mut stream, command)
        .await
        .context("Failed to send command")?;
    debug!("Sent {} to {}", command.code(), addr);

    if !command.code().has_response() {
        return Ok(());
    }

    let status = match stream.read_u8().await {
        Ok(byte) => ResponseStatus::from(byte),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            debug!("Connection closed without a response");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read response"),
    };
    if status == ResponseStatus::Stopped && !force {
        return Ok(());
    }

    let mut stdout = tokio::io::stdout();
    tokio::io::copy(&mut stream, &mut stdout)
        .await
        .context("Failed to read response")?;
    stdout.flush().await?;
    Ok(())
}
