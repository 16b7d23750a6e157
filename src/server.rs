use chrono::Utc;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::commands::executable::Executable;
use crate::commands::UdpCommand;
use crate::config::Config;
use crate::connection::Connection;
use crate::pool::WorkerPool;
use crate::reply::{TcpReply, UdpReply};
use crate::store::Store;
use crate::Error;

/// Largest datagram read from the gameplay socket. Valid requests are far
/// shorter; anything beyond this is cut and fails to decode.
const MAX_DATAGRAM_LEN: usize = 128;

/// The game server: gameplay requests over UDP and reports over TCP, both on
/// the same port number.
pub struct Server {
    udp: UdpSocket,
    tcp: TcpListener,
    store: Store,
    config: Config,
}

impl Server {
    pub async fn bind(config: Config) -> Result<Server, Error> {
        let store = Store::open(&config.data_dir, config.rules)?;
        let udp = UdpSocket::bind(config.addr()).await?;
        let tcp = TcpListener::bind(config.addr()).await?;

        Ok(Server {
            udp,
            tcp,
            store,
            config,
        })
    }

    pub fn udp_addr(&self) -> io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    pub fn tcp_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Serves requests until `token` is cancelled. Connections already
    /// accepted are answered before this returns.
    pub async fn run(self, token: CancellationToken) -> Result<(), Error> {
        info!(
            udp = %self.udp_addr()?,
            tcp = %self.tcp_addr()?,
            data_dir = %self.config.data_dir.display(),
            "game server listening"
        );

        let Server {
            udp,
            tcp,
            store,
            config,
        } = self;

        tokio::join!(
            serve_udp(udp, store.clone(), config.recv_timeout, token.clone()),
            serve_tcp(tcp, store, &config, token),
        );

        info!("game server stopped");
        Ok(())
    }
}

pub async fn run(config: Config, token: CancellationToken) -> Result<(), Error> {
    Server::bind(config).await?.run(token).await
}

async fn serve_udp(
    socket: UdpSocket,
    store: Store,
    recv_timeout: Duration,
    token: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

    while !token.is_cancelled() {
        let (len, peer) = match timeout(recv_timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                error!(cause = %e, "failed to receive datagram");
                continue;
            }
            Err(_) => continue,
        };

        let packet = &buf[..len];
        debug!(
            %peer,
            request = %String::from_utf8_lossy(packet).trim_end(),
            "received UDP request"
        );

        let reply = handle_datagram(packet, &store).await;
        debug!(%peer, %reply, "sending UDP reply");

        if let Err(e) = socket.send_to(&reply.serialize(), peer).await {
            error!(%peer, cause = %e, "failed to send reply");
        }
    }

    debug!("UDP listener stopped");
}

async fn handle_datagram(packet: &[u8], store: &Store) -> UdpReply {
    let command = match UdpCommand::try_from(packet) {
        Ok(command) => command,
        Err(e) => {
            warn!("{}", e);
            return e.udp_reply();
        }
    };

    match execute(command, store.clone()).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(cause = %e, "failed to execute request");
            UdpReply::Error
        }
    }
}

async fn serve_tcp(listener: TcpListener, store: Store, config: &Config, token: CancellationToken) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_timeout = config.connection_timeout;

    let pool = WorkerPool::spawn(
        config.workers,
        rx,
        move |(stream, client_address): (TcpStream, SocketAddr)| {
            let store = store.clone();
            async move {
                if let Err(e) =
                    handle_connection(stream, client_address, store, connection_timeout).await
                {
                    error!(cause = %e, %client_address, "connection failed");
                }
            }
        },
    );

    while !token.is_cancelled() {
        match timeout(config.recv_timeout, listener.accept()).await {
            Ok(Ok((stream, client_address))) => {
                debug!(%client_address, "accepted connection");
                if tx.send((stream, client_address)).is_err() {
                    break;
                }
            }
            Ok(Err(e)) => error!(cause = %e, "failed to accept connection"),
            Err(_) => continue,
        }
    }

    drop(tx);
    pool.join().await;
    debug!("TCP listener stopped");
}

#[instrument(
    name = "connection",
    skip(stream, store, connection_timeout),
    fields(connection_id)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    connection_timeout: Duration,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, client_address);

    tracing::Span::current().record("connection_id", conn.id.to_string());

    let request = match timeout(connection_timeout, conn.read_request()).await {
        Ok(request) => request,
        Err(_) => {
            warn!("timed out waiting for a request");
            return Ok(());
        }
    };

    let reply = match request {
        Ok(Some(command)) => {
            debug!(?command, "received TCP request");
            match execute(command, store).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(cause = %e, "failed to execute request");
                    TcpReply::Error
                }
            }
        }
        Ok(None) => {
            debug!("connection closed without a request");
            return Ok(());
        }
        Err(e) if e.is_protocol() => {
            warn!("{}", e);
            TcpReply::Error
        }
        Err(e) => return Err(e.into()),
    };

    debug!(%reply, "sending TCP reply");
    timeout(connection_timeout, conn.write_reply(reply)).await??;

    Ok(())
}

/// Runs a command on the blocking pool, as the store does synchronous file
/// I/O. The timestamp is taken right before the command runs.
async fn execute<C>(command: C, store: Store) -> Result<C::Reply, Error>
where
    C: Executable + Send + 'static,
    C::Reply: Send + 'static,
{
    let now = Utc::now();
    tokio::task::spawn_blocking(move || command.exec(&store, now)).await?
}
