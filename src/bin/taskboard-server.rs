//! Taskboard HTTP server entrypoint.

use anyhow::Context;
use tracing::info;

use taskboard::logging::init_structured_logging;
use taskboard::web::{create_app, state::AppState};
use taskboard::TaskboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = TaskboardConfig::from_env().context("failed to load configuration")?;
    let bind_address = config.bind_address.clone();

    let state = AppState::from_config(config)
        .await
        .context("failed to initialize application state")?;

    sqlx::migrate!("./migrations")
        .run(&state.db_pool)
        .await
        .context("failed to run database migrations")?;

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(address = %bind_address, "Taskboard server listening");

    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}
