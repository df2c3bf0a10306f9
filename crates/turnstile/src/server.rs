//! `TurnstileServer` builder, the RPC accept loop, and the services the
//! server is assembled from.
//!
//! This is the entry point for running a login tier. It ties together
//! the layers: transport → protocol → service → admission → session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use turnstile_admission::{AdmissionConfig, AdmissionController, run_promoter};
use turnstile_protocol::{Codec, JsonCodec};
use turnstile_session::{AccountStore, RandomTokenIssuer, TokenIssuer};

use crate::TurnstileError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::lifecycle::{Service, ServiceError, ServiceSet};
use crate::service::LoginService;
use crate::transport::RpcListener;

/// Connections that send nothing for this long are closed.
pub const DEFAULT_CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState<S: AccountStore, C: Codec> {
    pub(crate) service: LoginService<S>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Accepts gateway connections and answers RPCs until stopped.
pub struct RpcService<S: AccountStore, C: Codec> {
    listener: Option<RpcListener>,
    state: Arc<ServerState<S, C>>,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<S: AccountStore, C: Codec> Service for RpcService<S, C> {
    fn name(&self) -> &str {
        "rpc"
    }

    fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.is_some() {
            return Err(ServiceError::AlreadyRunning(self.name().to_string()));
        }
        // The listener is moved into the accept loop; a stopped RPC
        // service can't be restarted.
        let listener = self.listener.take().ok_or_else(|| ServiceError::StartFailed {
            name: self.name().to_string(),
            reason: "listener already consumed".to_string(),
        })?;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(accept_loop(listener, Arc::clone(&self.state), cancel.clone()));
        self.running = Some((cancel, handle));
        Ok(())
    }

    fn stop(&mut self) -> Option<JoinHandle<()>> {
        let (cancel, handle) = self.running.take()?;
        cancel.cancel();
        Some(handle)
    }
}

/// Runs the accept loop. Each connection gets its own task and a child
/// of `cancel`, so stopping the service also closes open connections.
async fn accept_loop<S: AccountStore, C: Codec>(
    listener: RpcListener,
    state: Arc<ServerState<S, C>>,
    cancel: CancellationToken,
) {
    tracing::info!("Turnstile RPC service accepting connections");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&state);
                    let shutdown = cancel.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, state, shutdown).await {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    tracing::info!("Turnstile RPC service stopped accepting connections");
}

/// Drives [`run_promoter`] as a service.
pub struct PromoterService<T: TokenIssuer = RandomTokenIssuer> {
    controller: Arc<AdmissionController<T>>,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<T: TokenIssuer> PromoterService<T> {
    pub fn new(controller: Arc<AdmissionController<T>>) -> Self {
        Self {
            controller,
            running: None,
        }
    }
}

impl<T: TokenIssuer> Service for PromoterService<T> {
    fn name(&self) -> &str {
        "queue-promoter"
    }

    fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.is_some() {
            return Err(ServiceError::AlreadyRunning(self.name().to_string()));
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_promoter(Arc::clone(&self.controller), cancel.clone()));
        self.running = Some((cancel, handle));
        Ok(())
    }

    fn stop(&mut self) -> Option<JoinHandle<()>> {
        let (cancel, handle) = self.running.take()?;
        cancel.cancel();
        Some(handle)
    }
}

// ---------------------------------------------------------------------------
// Builder and server
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Turnstile server.
///
/// # Example
///
/// ```rust,no_run
/// use turnstile::prelude::*;
///
/// # async fn run() -> Result<(), TurnstileError> {
/// let accounts = MemoryAccountStore::new(12)?;
/// let server = TurnstileServerBuilder::new()
///     .bind("0.0.0.0:8090")
///     .admission(AdmissionConfig::with_capacity(500))
///     .build(accounts)
///     .await?;
/// server.serve_until(async { let _ = tokio::signal::ctrl_c().await; }).await
/// # }
/// ```
pub struct TurnstileServerBuilder {
    bind_addr: String,
    admission: AdmissionConfig,
    idle_timeout: Duration,
}

impl TurnstileServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8090".to_string(),
            admission: AdmissionConfig::default(),
            idle_timeout: DEFAULT_CONNECTION_IDLE_TIMEOUT,
        }
    }

    /// Takes the bind address and admission settings from a loaded config.
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.bind_addr = config.bind_addr.clone();
        self.admission = config.admission.clone();
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets capacity, re-login policy, and queue timing.
    pub fn admission(mut self, config: AdmissionConfig) -> Self {
        self.admission = config;
        self
    }

    /// Sets how long a gateway connection may stay silent.
    pub fn connection_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `RandomTokenIssuer`.
    pub async fn build<S: AccountStore>(
        self,
        accounts: S,
    ) -> Result<TurnstileServer<S>, TurnstileError> {
        let listener = RpcListener::bind(&self.bind_addr).await?;
        let controller = Arc::new(AdmissionController::new(self.admission));

        let state = Arc::new(ServerState {
            service: LoginService::new(accounts, Arc::clone(&controller)),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(TurnstileServer {
            listener,
            state,
            controller,
        })
    }
}

impl Default for TurnstileServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound, not yet running Turnstile server.
///
/// Call [`serve_until`](Self::serve_until) to run it, or
/// [`into_services`](Self::into_services) to manage the parts yourself.
pub struct TurnstileServer<S: AccountStore> {
    listener: RpcListener,
    state: Arc<ServerState<S, JsonCodec>>,
    controller: Arc<AdmissionController>,
}

impl<S: AccountStore> TurnstileServer<S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The admission controller, for operator tooling and tests.
    pub fn controller(&self) -> &Arc<AdmissionController> {
        &self.controller
    }

    /// Splits the server into its services: the queue promoter first,
    /// then the RPC listener (stopped in the reverse order).
    pub fn into_services(self) -> ServiceSet {
        let mut services = ServiceSet::new();
        services.push(PromoterService::new(self.controller));
        services.push(RpcService {
            listener: Some(self.listener),
            state: self.state,
            running: None,
        });
        services
    }

    /// Starts all services, waits for `shutdown` to complete, then stops
    /// them gracefully.
    pub async fn serve_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TurnstileError> {
        let mut services = self.into_services();
        services.start_all().await?;
        tracing::info!(services = ?services.names(), "Turnstile server running");

        shutdown.await;

        tracing::info!("shutdown requested, stopping services");
        services.stop_all().await;
        Ok(())
    }
}
