//! WebSocket transport for RPC frames, using `tokio-tungstenite`.
//!
//! The listener only accepts TCP; the WebSocket upgrade runs in the
//! connection's own task so a slow client can't stall the accept loop.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The WebSocket upgrade failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] tungstenite::Error),
}

/// Opaque identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for gateway connections.
pub struct RpcListener {
    listener: TcpListener,
}

impl RpcListener {
    /// Binds to `addr`. Use port 0 to let the OS pick one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::Bind)?;
        tracing::info!(addr, "RPC listener bound");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection. Cancel-safe.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        self.listener.accept().await.map_err(TransportError::Accept)
    }
}

/// One upgraded WebSocket connection carrying RPC frames.
///
/// Requests on a connection are answered in order, so the stream is
/// owned by a single handler task and needs no lock.
pub struct RpcConnection {
    id: ConnectionId,
    peer: SocketAddr,
    ws: WebSocketStream<TcpStream>,
}

impl RpcConnection {
    /// Performs the WebSocket upgrade on an accepted stream.
    pub async fn upgrade(stream: TcpStream, peer: SocketAddr) -> Result<Self, TransportError> {
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(TransportError::Handshake)?;
        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted WebSocket connection");
        Ok(Self { id, peer, ws })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Sends one frame. UTF-8 payloads go out as text frames, anything
    /// else as binary.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let msg = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::text(text),
            Err(e) => Message::binary(e.into_bytes()),
        };
        self.ws.send(msg).await.map_err(TransportError::Send)
    }

    /// Receives the next data frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection. Control
    /// frames are skipped. Cancel-safe.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame
                Some(Err(e)) => return Err(TransportError::Receive(e)),
            }
        }
    }

    /// Starts the closing handshake. Errors are ignored; the peer may
    /// already be gone.
    pub async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::trace!(id = %self.id, error = %e, "close failed");
        }
    }
}
