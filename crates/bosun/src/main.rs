use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use bosun_core::{default_socket_path, now_ms};
use bosun_ops::{Echo, Ping, ServerInfoRequest};
use bosun_proto::{ChannelPeer, Dispatcher, HandlerRegistry, Operation, ProtoError, WorkerPool};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tokio::{net::UnixStream, time::timeout};

#[derive(Debug, Parser)]
#[command(name = "bosun", about = "Bosun fabric CLI")]
struct Cli {
    /// Daemon control socket path.
    #[arg(long, default_value_os_t = default_socket_path())]
    socket: PathBuf,
    /// Per-call timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probes daemon liveness.
    Ping,
    /// Prints daemon build and uptime metadata.
    Info {
        /// Emit the reply as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Round-trips a message through the daemon.
    Echo { message: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("daemon returned mismatched ping nonce: sent {sent}, got {got}")]
    NonceMismatch { sent: u64, got: u64 },
    #[error("failed to render json: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let stream = UnixStream::connect(&cli.socket).await?;
    let peer = ChannelPeer::start(stream, Arc::new(HandlerRegistry::new()));
    let dispatcher = Dispatcher::new(Arc::new(WorkerPool::new(2)), Arc::new(peer));
    let deadline = Duration::from_millis(cli.timeout_ms);

    match cli.command {
        Command::Ping => {
            let nonce = now_ms();
            let pong = call(&dispatcher, Ping { nonce }, deadline, cli.timeout_ms).await?;
            if pong.nonce != nonce {
                return Err(CliError::NonceMismatch {
                    sent: nonce,
                    got: pong.nonce,
                });
            }
            println!("pong");
            Ok(())
        }
        Command::Info { json } => {
            let info = call(&dispatcher, ServerInfoRequest {}, deadline, cli.timeout_ms).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("bosund {} (protocol {})", info.daemon, info.protocol);
                println!(
                    "uptime: {} ms, served: {} requests",
                    info.uptime_ms, info.served_requests
                );
            }
            Ok(())
        }
        Command::Echo { message } => {
            let reply = call(&dispatcher, Echo { message }, deadline, cli.timeout_ms).await?;
            println!("{}", reply.message);
            Ok(())
        }
    }
}

/// Dispatches one operation with an externally composed timeout.
///
/// On expiry the process exits shortly after; dropping the channel peer
/// cancels the still-pending entry so nothing leaks.
async fn call<O: Operation>(
    dispatcher: &Dispatcher,
    op: O,
    deadline: Duration,
    timeout_ms: u64,
) -> Result<O::Response, CliError> {
    match timeout(deadline, dispatcher.submit(op).wait()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CliError::Timeout(timeout_ms)),
    }
}
