//! meterline exporter
//!
//! Serves the registry over HTTP for a pull-based scraper.
//! - `GET /metrics` : text exposition 0.0.4
//! - `GET /healthz` : liveness

use tracing_subscriber::{fmt, EnvFilter};

use meterline_exporter::{app_state, config, router, Result};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "meterline-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "meterline-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
