//! OpenSASE Storefront - catalog, cart and checkout service

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_storefront::api::{self, AppState};
use opensase_storefront::application::payment::SimulatedPaymentGateway;
use opensase_storefront::application::StorefrontService;
use opensase_storefront::config::AppConfig;
use opensase_storefront::infrastructure::{
    ConnectionManager, EventPublisher, HealthMonitor, LogEventPublisher, NatsEventPublisher, PgConnector,
    PostgresCatalogRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opensase_storefront=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(?config, "Configuration loaded");

    let connections = Arc::new(ConnectionManager::new(PgConnector::new(config.pool.clone()), config.probe_timeout));
    let connected = match connections.reconnect(&config.database_url).await {
        Ok(()) => true,
        // The health monitor keeps retrying; /health reports 503 until it succeeds.
        Err(err) => {
            tracing::warn!(error = %err, "Initial database connection failed, starting degraded");
            false
        }
    };

    if config.run_migrations {
        if connected {
            apply_migrations(&connections).await?;
        } else {
            // Deferred until the monitor's first successful reconnect.
            let connections = connections.clone();
            tokio::spawn(async move {
                if let Err(err) = apply_migrations(&connections).await {
                    tracing::error!(error = %err, "Deferred migrations failed, schema may be missing");
                }
            });
        }
    }

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsEventPublisher::new(client)),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, logging events instead");
                Arc::new(LogEventPublisher)
            }
        },
        None => Arc::new(LogEventPublisher),
    };

    let service = StorefrontService::new(
        Arc::new(PostgresCatalogRepository::new(connections.clone())),
        Arc::new(SimulatedPaymentGateway),
        events,
        config.checkout_mode,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = HealthMonitor::new(connections.clone(), config.database_url.clone(), config.health_check_interval)
        .spawn(shutdown_rx);

    let app = api::router(AppState::new(Arc::new(service), config.request_timeout));
    let addr = config.socket_addr();
    tracing::info!("OpenSASE Storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    let _ = shutdown_tx.send(true);
    let _ = monitor.await;
    connections.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Waits for a live connection, then applies pending migrations.
async fn apply_migrations(connections: &ConnectionManager<PgConnector>) -> Result<()> {
    connections.subscribe().wait_for(|connects| *connects > 0).await?;
    let pool = connections.handle()?;
    sqlx::migrate!("./migrations").run(&pool).await.context("running migrations")?;
    tracing::info!("Migrations applied");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
