use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use classroom_server::{app, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let classroom = config.build_classroom()?;
    let defaults = classroom.defaults();
    info!(
        scenario = %defaults.scenario_name,
        role_policy = ?defaults.role_policy,
        mechanism_policy = ?defaults.mechanism_policy,
        lock_price_policy = ?defaults.lock_price_policy,
        "Classroom ready"
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Classroom server listening");
    axum::serve(listener, app(classroom)).await?;

    Ok(())
}
