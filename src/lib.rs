pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::services::announcer::RedisStreamPublisher;
use crate::services::judge0::Judge0Client;
use crate::services::mock_judge::{self, MockJudge};
use crate::services::submission_store::{PgSubmissionStore, SubmissionStore};
use crate::tasks::reconciler::leader::LeaderLease;
use crate::tasks::reconciler::{Reconciler, ReconcilerConfig};
use crate::tasks::scheduler::{self, ReconcilerHandle};

/// Ingestion API plus, unless disabled, the reconciler in the same process.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await.context("Failed to connect to Postgres")?;
    db::run_migrations(&db_pool).await.context("Failed to run migrations")?;

    let redis = connect_redis(&settings).await;
    let store: Arc<dyn SubmissionStore> = Arc::new(PgSubmissionStore::new(db_pool.clone()));

    // Bind first so a taken port exits before the reconciler claims the lease.
    let listener = bind_api(&settings).await?;

    let reconciler = if settings.reconciler().enabled {
        Some(start_reconciler(&settings, db_pool.clone(), store.clone(), redis.clone())?)
    } else {
        tracing::info!("Reconciler disabled; serving ingestion only");
        None
    };

    let state = AppState::new(settings, db_pool, redis.clone(), store);
    let app = api::router::router(state.clone());

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Judge integrator listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::drain("api")).await;

    if let Some(reconciler) = reconciler {
        reconciler.stop().await;
    }
    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

/// Reconciler only, for deployments that scale ingestion separately.
pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await.context("Failed to connect to Postgres")?;
    db::run_migrations(&db_pool).await.context("Failed to run migrations")?;

    let redis = connect_redis(&settings).await;
    let store: Arc<dyn SubmissionStore> = Arc::new(PgSubmissionStore::new(db_pool.clone()));
    let reconciler = start_reconciler(&settings, db_pool, store, redis.clone())?;

    core::shutdown::drain("worker").await;
    reconciler.stop().await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    Ok(())
}

/// Judge0 stand-in for local development.
pub async fn run_mock_judge() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let addr = format!("{}:{}", settings.server_host(), settings.mock_judge().port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind mock judge on {addr}"))?;
    tracing::info!(addr = %addr, "Mock judge listening");

    axum::serve(listener, mock_judge::router(MockJudge::random()))
        .with_graceful_shutdown(core::shutdown::drain("mock-judge"))
        .await?;

    Ok(())
}

async fn connect_redis(settings: &Settings) -> RedisHandle {
    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(
            error = %err,
            "Failed to connect to Redis; announcements retry once it is reachable"
        );
    } else {
        tracing::info!("Redis connected successfully");
    }
    redis
}

async fn bind_api(settings: &Settings) -> anyhow::Result<tokio::net::TcpListener> {
    let addr = settings.server_addr();
    tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("Failed to bind {addr}"))
}

fn start_reconciler(
    settings: &Settings,
    db_pool: PgPool,
    store: Arc<dyn SubmissionStore>,
    redis: RedisHandle,
) -> anyhow::Result<ReconcilerHandle> {
    let engine = Arc::new(Judge0Client::from_settings(settings)?);
    let publisher = Arc::new(RedisStreamPublisher::from_settings(settings, redis));
    let config = ReconcilerConfig::from_settings(settings.reconciler());

    tracing::info!(
        judge_url = %settings.judge().base_url,
        stream = %settings.redis().results_stream,
        batch_size = config.batch_size,
        concurrency = config.concurrency,
        max_submit_attempts = config.max_submit_attempts,
        "Starting reconciler"
    );

    let reconciler = Reconciler::new(store, engine, publisher, config);
    Ok(scheduler::spawn(
        reconciler,
        settings.reconciler().interval(),
        Some(LeaderLease::new(db_pool)),
    ))
}
