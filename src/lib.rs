pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::services::assignments::postgres::PgAssignmentStore;
use crate::services::notifications::Notifier;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;
    let store = PgAssignmentStore::new(
        db_pool.clone(),
        Duration::from_secs(settings.database().statement_timeout_seconds),
    );

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; notifications will be dropped");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let notifier = Notifier::new(Arc::new(redis.clone()), &settings);
    let state = AppState::new(settings, Arc::new(store), redis.clone(), notifier);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        addr = %state.settings().server_addr(),
        api_prefix = %state.settings().api().api_prefix,
        environment = %state.settings().runtime().environment.as_str(),
        "Assignments API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    db_pool.close().await;
    tracing::info!("Connections closed");

    result?;

    Ok(())
}
