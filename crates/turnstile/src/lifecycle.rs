//! Service lifecycle: independently started and stopped background parts.
//!
//! A process is an ordered list of [`Service`]s. [`ServiceSet`] starts
//! them in registration order and stops them in reverse, so a service
//! can rely on everything registered before it still running.

use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service {0} is already running")]
    AlreadyRunning(String),

    #[error("service {name} failed to start: {reason}")]
    StartFailed { name: String, reason: String },
}

/// A long-running part of the server.
///
/// `start` spawns the service's task(s) and returns without waiting for
/// them; it must be called from within a Tokio runtime. `stop` signals
/// shutdown and hands back the task handle so the caller can wait for
/// the service to wind down.
pub trait Service: Send + 'static {
    fn name(&self) -> &str;

    /// # Errors
    /// [`ServiceError`] if the service is already running or can't start.
    fn start(&mut self) -> Result<(), ServiceError>;

    /// Signals shutdown. Returns `None` if the service wasn't running.
    fn stop(&mut self) -> Option<JoinHandle<()>>;
}

/// An ordered list of services started and stopped together.
#[derive(Default)]
pub struct ServiceSet {
    services: Vec<Box<dyn Service>>,
    /// How many services, from the front, are currently running.
    started: usize,
}

impl ServiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a service. It starts after every service added before it.
    pub fn push(&mut self, service: impl Service) {
        self.services.push(Box::new(service));
    }

    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Starts every service in order.
    ///
    /// If one fails, the services already started are stopped again (in
    /// reverse) before the error is returned.
    pub async fn start_all(&mut self) -> Result<(), ServiceError> {
        while self.started < self.services.len() {
            let service = &mut self.services[self.started];
            match service.start() {
                Ok(()) => {
                    tracing::info!(service = service.name(), "service started");
                    self.started += 1;
                }
                Err(e) => {
                    tracing::error!(
                        service = service.name(),
                        error = %e,
                        "service failed to start, rolling back"
                    );
                    self.stop_all().await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Stops every running service in reverse order, waiting for each to
    /// finish before stopping the next.
    pub async fn stop_all(&mut self) {
        while self.started > 0 {
            self.started -= 1;
            let service = &mut self.services[self.started];
            let name = service.name().to_string();
            if let Some(handle) = service.stop() {
                if let Err(e) = handle.await {
                    tracing::warn!(
                        service = %name,
                        error = %e,
                        "service task did not exit cleanly"
                    );
                }
            }
            tracing::info!(service = %name, "service stopped");
        }
    }
}
