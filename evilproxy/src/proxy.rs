//! The proxy engine: accepts inbound sockets and pumps their bytes through
//! a simulated transport to the upstream endpoint.
//!
//! Each proxied session runs four pump tasks, one per direction per socket.
//! The socket-to-connection pumps close their connection endpoint when the
//! socket stops producing; the connection-to-socket pumps shut down their
//! socket's write half when the simulated transport reports end-of-stream.
//! Between the two, every session resource is released exactly once and
//! in-flight bytes are always drained before anything is torn down.

use evilproxy_core::{
    construct_connections, Connection, ConnectionReader, ConnectionWriter, ParseError, PipeError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::timeout;

/// How long a session waits for the upstream dial before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Size of the copy buffer used by each pump direction.
const COPY_BUFFER: usize = 4096;

/// Settings for a running proxy, mirroring the command line arguments.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Address of the upstream endpoint to forward traffic to.
    pub client: String,
    /// Address to listen on for inbound connections.
    pub server: String,
    /// Number of sessions to serve before exiting, unlimited when `None`.
    pub connections: Option<usize>,
    /// Rule describing the simulated transport for each session.
    pub rule: String,
    /// Whether to log per-session task accounting.
    pub debug: bool,
}

/// An error that stops the whole proxy.
#[derive(Debug, ThisError)]
pub enum ProxyError {
    #[error("Unable to start the proxy on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("Unable to accept an inbound connection: {0}")]
    Accept(std::io::Error),
}

/// An error that abandons a single session. Other sessions continue.
#[derive(Debug, ThisError)]
enum SessionError {
    #[error("Unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("Timed out connecting to {addr}")]
    ConnectTimeout { addr: String },
    #[error("Unable to build the simulated transport: {0}")]
    Parse(#[from] ParseError),
}

/// Binds the configured listen address and serves sessions until the
/// configured connection count is reached, or forever when it is unlimited.
pub async fn run(settings: ProxySettings) -> Result<(), ProxyError> {
    let listener = TcpListener::bind(&settings.server)
        .await
        .map_err(|source| ProxyError::Bind {
            addr: settings.server.clone(),
            source,
        })?;
    serve(listener, settings).await
}

/// Serves sessions from an already-bound listener. Split out from [`run`] so
/// tests can bind to an ephemeral port first.
pub async fn serve(listener: TcpListener, settings: ProxySettings) -> Result<(), ProxyError> {
    tracing::info!(
        server = %settings.server,
        client = %settings.client,
        rule = %settings.rule,
        "proxy listening"
    );

    let settings = Arc::new(settings);
    let live_sessions = Arc::new(AtomicUsize::new(0));
    let mut sessions = JoinSet::new();
    let mut served = 0;
    while settings.connections.map_or(true, |limit| served < limit) {
        let (inbound, peer) = listener.accept().await.map_err(ProxyError::Accept)?;
        served += 1;
        tracing::info!(%peer, session = served, "accepted inbound connection");

        let settings = settings.clone();
        let live = live_sessions.clone();
        live.fetch_add(1, Ordering::Relaxed);
        sessions.spawn(async move {
            if let Err(error) = serve_session(inbound, &settings).await {
                tracing::error!(%error, "abandoning session");
            }
            let remaining = live.fetch_sub(1, Ordering::Relaxed) - 1;
            if settings.debug {
                tracing::debug!(live_sessions = remaining, "session finished");
            }
        });
    }

    // Let in-progress sessions wind down before exiting
    while let Some(result) = sessions.join_next().await {
        if let Err(error) = result {
            tracing::error!(%error, "session task failed");
        }
    }
    Ok(())
}

/// Proxies one inbound socket: dials upstream, builds the simulated
/// transport, and runs the four byte pumps to completion.
async fn serve_session(inbound: TcpStream, settings: &ProxySettings) -> Result<(), SessionError> {
    let outbound = dial_upstream(&settings.client).await?;
    let (inbound_conn, outbound_conn) = construct_connections(&settings.rule)?;
    let inbound_conn = Arc::new(inbound_conn);
    let outbound_conn = Arc::new(outbound_conn);

    let (inbound_read, inbound_write) = inbound.into_split();
    let (outbound_read, outbound_write) = outbound.into_split();

    let mut pumps = JoinSet::new();
    pumps.spawn(socket_to_connection(inbound_read, inbound_conn.clone()));
    pumps.spawn(connection_to_socket(outbound_conn.clone(), outbound_write));
    pumps.spawn(socket_to_connection(outbound_read, outbound_conn));
    pumps.spawn(connection_to_socket(inbound_conn, inbound_write));
    while let Some(result) = pumps.join_next().await {
        if let Err(error) = result {
            tracing::error!(%error, "pump task failed");
        }
    }
    Ok(())
}

async fn dial_upstream(addr: &str) -> Result<TcpStream, SessionError> {
    match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(SessionError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(SessionError::ConnectTimeout {
            addr: addr.to_string(),
        }),
    }
}

/// Copies socket bytes into the connection until the socket stops
/// producing, then closes the connection endpoint so the peer can drain
/// what is in flight and observe end-of-stream.
async fn socket_to_connection(mut socket: OwnedReadHalf, connection: Arc<Connection>) {
    let writer = ConnectionWriter::new(connection.clone());
    let mut buf = [0u8; COPY_BUFFER];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => break,
            Ok(count) => {
                if let Err(error) = writer.write(&buf[..count]) {
                    tracing::debug!(%error, "stopping pump into a closed connection");
                    break;
                }
            }
            Err(error) => {
                tracing::debug!(%error, "socket read failed");
                break;
            }
        }
    }
    if let Err(error) = connection.close() {
        tracing::debug!(%error, "connection was closed before its pump finished");
    }
}

/// Drains the connection into the socket until the simulated transport
/// reports end-of-stream, then shuts down the socket's write half so the
/// real peer sees EOF.
async fn connection_to_socket(connection: Arc<Connection>, mut socket: OwnedWriteHalf) {
    let mut reader = ConnectionReader::new(connection);
    let mut buf = [0u8; COPY_BUFFER];
    loop {
        match reader.read(&mut buf).await {
            Ok(count) => {
                if let Err(error) = socket.write_all(&buf[..count]).await {
                    tracing::debug!(%error, "socket write failed");
                    break;
                }
            }
            Err(PipeError::EndOfStream) => break,
            Err(error) => {
                tracing::debug!(%error, "connection read failed");
                break;
            }
        }
    }
    if let Err(error) = socket.shutdown().await {
        tracing::debug!(%error, "socket shutdown failed");
    }
}
