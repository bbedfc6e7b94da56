use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use domain::services::{InMemoryGateway, InviteGateway};
use persistence::repositories::{DefaultRoleRepository, InviteRepository};
use tokio::sync::mpsc;
use tracing::{info, warn};

use role_invite_api::app::{create_app, AppState};
use role_invite_api::config::Config;
use role_invite_api::jobs::{JobScheduler, PoolMetricsJob, ReconcileInvitesJob};
use role_invite_api::middleware::{init_logging, init_metrics};
use role_invite_api::services::{Attributor, DiscordGateway, EventDispatcher, Reconciler};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging).context("failed to initialize logging")?;
    init_metrics().context("failed to install metrics recorder")?;

    info!("Starting role invite service v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;
    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let gateway: Arc<dyn InviteGateway> = if config.discord.enabled {
        Arc::new(DiscordGateway::new(&config.discord)?)
    } else {
        warn!("Discord gateway disabled, using in-memory gateway (development mode)");
        Arc::new(InMemoryGateway::new())
    };

    let invites = InviteRepository::new(pool.clone());
    let attributor = Arc::new(Attributor::new(
        invites.clone(),
        DefaultRoleRepository::new(pool.clone()),
        Arc::clone(&gateway),
        config.attribution.default_role_while_pending,
    ));

    let (events_tx, events_rx) = mpsc::channel(config.attribution.event_queue_capacity);
    let dispatcher = Arc::new(EventDispatcher::new(attributor, invites.clone())).spawn(events_rx);

    let mut scheduler = JobScheduler::new();
    if config.reconciler.enabled {
        scheduler.register(ReconcileInvitesJob::new(
            Reconciler::new(invites, Arc::clone(&gateway)),
            config.reconciler.interval_secs,
        ));
    } else {
        warn!("Invite reconciliation disabled");
    }
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.start();

    let addr = config.socket_addr()?;
    let app = create_app(AppState {
        pool: pool.clone(),
        config: Arc::new(config),
        gateway,
        events: events_tx,
    });

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router and its event sender are dropped once serving stops, which
    // closes the queue and lets the dispatcher drain.
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    if tokio::time::timeout(Duration::from_secs(30), dispatcher)
        .await
        .is_err()
    {
        warn!("Event handlers still running at shutdown");
    }

    info!("Checkpointing SQLite WAL...");
    if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
        .execute(&pool)
        .await
    {
        warn!("WAL checkpoint failed: {}", e);
    }
    pool.close().await;

    info!("Server stopped cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received, draining connections...");
}
