use anyhow::Context;
use face_enrollment_node::{utils::{config::Config, logging}, Application};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::new().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting Face Enrollment Node v{}", env!("CARGO_PKG_VERSION"));

    // Missing or invalid identity credentials are fatal
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    app.start().await.map_err(|e| {
        error!("Failed to start application: {}", e);
        e
    })?;

    info!("Application started successfully");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }

    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    Ok(())
}
