mod handlers;
mod state;

use std::{
    fs, io,
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use bosun_core::{PROTOCOL_VERSION, default_socket_path};
use bosun_proto::ChannelPeer;
use clap::Parser;
use handlers::builtin_handlers;
use state::DaemonState;
use tokio::net::UnixListener;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "bosund", about = "Bosun fabric daemon")]
struct Args {
    /// Control socket path.
    #[arg(long, default_value_os_t = default_socket_path())]
    socket: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bosund error: {err}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    prepare_socket_path(&args.socket)?;

    let state = Arc::new(DaemonState::new());
    let handlers = builtin_handlers(Arc::clone(&state));
    let listener = UnixListener::bind(&args.socket)?;

    info!(
        socket = %args.socket.display(),
        daemon = env!("CARGO_PKG_VERSION"),
        protocol = PROTOCOL_VERSION,
        "starting bosund"
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let handlers = Arc::clone(&handlers);
                tokio::spawn(async move {
                    let peer = ChannelPeer::start(stream, handlers);
                    peer.closed().await;
                    debug!("connection closed");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!(served = state.served(), "shutting down");
                break;
            }
        }
    }

    let _ = fs::remove_file(&args.socket);
    Ok(())
}

fn prepare_socket_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() {
                fs::remove_file(path)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a socket", path.display()),
                ))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
