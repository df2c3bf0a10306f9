use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnstile::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Turnstile login server");

    let config = ServerConfig::from_env().map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    info!(
        bind_addr = %config.bind_addr,
        capacity = config.admission.capacity,
        relogin = ?config.admission.relogin,
        "configuration loaded"
    );

    let accounts = MemoryAccountStore::new(config.bcrypt_cost)?;
    let server = TurnstileServerBuilder::new()
        .config(&config)
        .build(accounts)
        .await?;
    info!(addr = %server.local_addr()?, "listening");

    server
        .serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
            }
        })
        .await?;

    info!("Turnstile stopped");
    Ok(())
}
