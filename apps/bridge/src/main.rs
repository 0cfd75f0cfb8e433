//! Proclaim bridge entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting Proclaim bridge"
    );

    let path = config::config_path()?;
    let config = config::Config::load_from(&path)?;
    tracing::info!(path = %path.display(), host = %config.host, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, path))?;

    tracing::info!("bridge shut down cleanly");
    Ok(())
}
