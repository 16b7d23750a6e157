use clap::Parser;
use mastermind::config::{Config, DEFAULT_DATA_DIR, DEFAULT_PORT, DEFAULT_WORKERS};
use mastermind::{server, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// The port to listen on, for both UDP and TCP
    #[arg(short, long, env = "GS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// The address to bind to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Where games and scores are stored
    #[arg(long, env = "GS_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Log every request and reply
    #[arg(short, long)]
    verbose: bool,

    /// Number of workers answering TCP requests
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            host: args.host,
            port: args.port,
            data_dir: args.data_dir,
            verbose: args.verbose,
            workers: args.workers.max(1),
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from(Args::parse());

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    let token = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(token.clone()));

    server::run(config, token).await
}

async fn shutdown_on_signal(token: CancellationToken) {
    if let Err(e) = wait_for_signal().await {
        error!(cause = %e, "failed to listen for shutdown signals");
        return;
    }
    info!("shutting down");
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    signal::ctrl_c().await?;
    info!("received Ctrl+C");
    Ok(())
}
