//! Per-connection handler: decode request, dispatch, encode response.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Upgrade the TCP stream to WebSocket
//!   2. Loop: receive a `Request` frame → dispatch → send the `Response`
//!   3. Exit on close, idle timeout, transport error, or shutdown

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use turnstile_protocol::{Codec, CommonReply, Reply, Request, Response, StatusCode};
use turnstile_session::AccountStore;

use crate::TurnstileError;
use crate::server::ServerState;
use crate::transport::RpcConnection;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    state: Arc<ServerState<S, C>>,
    shutdown: CancellationToken,
) -> Result<(), TurnstileError>
where
    S: AccountStore,
    C: Codec,
{
    let mut conn = RpcConnection::upgrade(stream, peer).await?;
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer(), "handling new connection");

    loop {
        let data = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(%conn_id, "closing connection for shutdown");
                break;
            }
            received = tokio::time::timeout(state.idle_timeout, conn.recv()) => match received {
                Ok(Ok(Some(data))) => data,
                Ok(Ok(None)) => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    break;
                }
                Ok(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
                Err(_) => {
                    tracing::info!(%conn_id, %peer, "connection idle, closing");
                    break;
                }
            }
        };

        let response = match state.codec.decode::<Request>(&data) {
            Ok(request) => {
                tracing::debug!(
                    %conn_id,
                    id = request.id,
                    method = request.call.method(),
                    "request"
                );
                Response {
                    id: request.id,
                    reply: state.service.dispatch(request.call).await,
                }
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                Response {
                    id: 0,
                    reply: Reply::Common(CommonReply::new(
                        StatusCode::InvalidArgument,
                        format!("malformed request: {e}"),
                    )),
                }
            }
        };

        let bytes = state.codec.encode(&response)?;
        conn.send(&bytes).await?;
    }

    conn.close().await;
    Ok(())
}
